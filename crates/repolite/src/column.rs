//! Static column metadata for entity types.

use crate::value::{SqlDbType, SqlValue, ValueType};

/// Metadata for one column of an entity.
///
/// Built at compile time (usually by `#[derive(Entity)]`) and shared by every
/// query against the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub value_type: ValueType,
    pub db_type: SqlDbType,
    /// Declared column type text, e.g. `[NVARCHAR](MAX)`.
    pub sql_type_text: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    /// Value generated by the database; skipped on insert.
    pub identity: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, value_type: ValueType, db_type: SqlDbType) -> Self {
        Self {
            name,
            value_type,
            db_type,
            sql_type_text: "",
            nullable: false,
            primary_key: false,
            identity: false,
        }
    }

    /// Column whose type information comes from the field's Rust type.
    pub const fn of<T: SqlValue>(name: &'static str) -> Self {
        Self {
            name,
            value_type: T::VALUE_TYPE,
            db_type: T::DB_TYPE,
            sql_type_text: T::SQL_TYPE_TEXT,
            nullable: T::NULLABLE,
            primary_key: false,
            identity: false,
        }
    }

    pub const fn sql_type(mut self, text: &'static str) -> Self {
        self.sql_type_text = text;
        self
    }

    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Whether predicates must compare this column through its text form.
    pub fn needs_text_cast(&self) -> bool {
        self.value_type.is_text_cast()
    }
}

/// Find a column by name.
pub fn find_column<'a>(columns: &'a [ColumnDef], name: &str) -> Option<&'a ColumnDef> {
    columns.iter().find(|c| c.name == name)
}
