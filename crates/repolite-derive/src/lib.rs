//! Derive macros for repolite
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;

/// Derive the `Entity` trait for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use repolite::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(schema = "sales", table = "Orders")]
/// struct Order {
///     #[orm(id, identity)]
///     id: i32,
///     customer_id: i32,
///     #[orm(column = "Notes", sql_type = "[XML]")]
///     notes: Option<repolite::Xml>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(name = "...")]` - Entity name used in join aliases (default: struct name)
/// - `#[orm(schema = "...")]` - Schema (default: `dbo`)
/// - `#[orm(table = "...")]` - Table (default: entity name)
///
/// Field level:
/// - `#[orm(column = "...")]` - Column name (default: field name in UpperCamelCase)
/// - `#[orm(id)]` - Primary key
/// - `#[orm(identity)]` - Database-generated; skipped on insert
/// - `#[orm(sql_type = "...")]` - Override the declared column type text
/// - `#[orm(skip)]` - Not a column; left at its default when hydrating
/// - `#[orm(required)]` - `validate` reports an error when the value is NULL
/// - `#[orm(max_len = N)]` - `validate` reports an error for text longer than `N` characters
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
