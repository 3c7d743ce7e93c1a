//! `#[orm(...)]` attribute parsing.

use heck::ToUpperCamelCase;
use syn::{Attribute, Field, LitInt, LitStr, Result};

#[derive(Default)]
pub(crate) struct EntityAttrs {
    pub name: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
}

pub(crate) struct FieldAttrs {
    pub column: String,
    pub is_id: bool,
    pub identity: bool,
    pub sql_type: Option<String>,
    pub skip: bool,
    pub required: bool,
    pub max_len: Option<usize>,
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("orm"))
}

pub(crate) fn entity_attrs(attrs: &[Attribute]) -> Result<EntityAttrs> {
    let mut out = EntityAttrs::default();
    for attr in orm_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("name") {
                &mut out.name
            } else if meta.path.is_ident("schema") {
                &mut out.schema
            } else if meta.path.is_ident("table") {
                &mut out.table
            } else {
                return Err(meta.error("expected `name`, `schema` or `table`"));
            };
            *slot = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        })?;
    }
    Ok(out)
}

pub(crate) fn field_attrs(field: &Field) -> Result<FieldAttrs> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

    let mut column = None;
    let mut out = FieldAttrs {
        column: String::new(),
        is_id: false,
        identity: false,
        sql_type: None,
        skip: false,
        required: false,
        max_len: None,
    };

    for attr in orm_attrs(&field.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                out.is_id = true;
            } else if meta.path.is_ident("identity") {
                out.identity = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("required") {
                out.required = true;
            } else if meta.path.is_ident("max_len") {
                out.max_len = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("column") {
                column = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("sql_type") {
                out.sql_type = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error(
                    "expected `column`, `id`, `identity`, `sql_type`, `skip`, `required` or `max_len`",
                ));
            }
            Ok(())
        })?;
    }

    let raw = ident.to_string();
    let raw = raw.strip_prefix("r#").unwrap_or(&raw);
    out.column = column.unwrap_or_else(|| raw.to_upper_camel_case());
    Ok(out)
}
