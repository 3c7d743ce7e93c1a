//! Entity derive macro implementation

use crate::attrs::{entity_attrs, field_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let attrs = entity_attrs(&input.attrs)?;
    let entity_name = attrs.name.unwrap_or_else(|| name.to_string());
    let schema_const = attrs
        .schema
        .map(|s| quote! { const SCHEMA: &'static str = #s; });
    let table_const = attrs
        .table
        .map(|t| quote! { const TABLE: &'static str = #t; });

    let mut column_defs = Vec::new();
    let mut setters = Vec::new();
    let mut getters = Vec::new();
    let mut checks = Vec::new();
    let mut has_id = false;

    for field in fields {
        let info = field_attrs(field)?;
        if info.skip {
            continue;
        }
        if info.is_id {
            if has_id {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field may be marked #[orm(id)]",
                ));
            }
            has_id = true;
        }

        let ident = field.ident.as_ref();
        let ty = &field.ty;
        let column = &info.column;

        let mut def = quote! { ::repolite::ColumnDef::of::<#ty>(#column) };
        if info.is_id {
            def = quote! { #def.primary_key() };
        }
        if info.identity {
            def = quote! { #def.identity() };
        }
        if let Some(sql_type) = &info.sql_type {
            def = quote! { #def.sql_type(#sql_type) };
        }
        column_defs.push(def);

        setters.push(quote! {
            self.#ident = row.get_or_default(&::std::format!("{}{}", prefix, #column))?;
        });
        getters.push(quote! {
            <#ty as ::repolite::SqlValue>::to_value(&self.#ident)
        });

        if info.required || info.max_len.is_some() {
            let required = info
                .required
                .then(|| quote! { errors.check_required(#column, &value); });
            let max_len = info
                .max_len
                .map(|max| quote! { errors.check_max_len(#column, &value, #max); });
            checks.push(quote! {
                {
                    let value = <#ty as ::repolite::SqlValue>::to_value(&self.#ident);
                    #required
                    #max_len
                }
            });
        }
    }

    let validate_fn = (!checks.is_empty()).then(|| {
        quote! {
            fn validate(&self) -> ::repolite::ValidationErrors {
                let mut errors = ::repolite::ValidationErrors::default();
                #(#checks)*
                errors
            }
        }
    });

    let count = column_defs.len();

    Ok(quote! {
        impl ::repolite::Entity for #name {
            const ENTITY_NAME: &'static str = #entity_name;
            #schema_const
            #table_const

            fn columns() -> &'static [::repolite::ColumnDef] {
                static COLUMNS: [::repolite::ColumnDef; #count] = [#(#column_defs),*];
                &COLUMNS
            }

            fn set_values(
                &mut self,
                row: &::repolite::Row,
                prefix: &str,
            ) -> ::repolite::OrmResult<()> {
                #(#setters)*
                ::std::result::Result::Ok(())
            }

            fn values(&self) -> ::std::vec::Vec<::repolite::Value> {
                ::std::vec![#(#getters),*]
            }

            #validate_fn
        }
    })
}
