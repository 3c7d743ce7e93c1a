//! Result rows and the entity mapping trait.

use crate::changeset::ValidationErrors;
use crate::column::{ColumnDef, find_column};
use crate::error::{OrmError, OrmResult};
use crate::value::{SqlValue, Value};
use std::sync::Arc;

/// One result-set row: shared column names plus this row's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Typed value of a column; a missing column or a mismatched value is an error.
    pub fn try_get<T: SqlValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "column not found in result set"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Typed value of a column, or `T::default()` when it is NULL or absent.
    pub fn get_or_default<T: SqlValue + Default>(&self, column: &str) -> OrmResult<T> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => T::from_value(value).map_err(|message| OrmError::decode(column, message)),
        }
    }
}

/// A persistable type with static column metadata.
///
/// Usually implemented with `#[derive(Entity)]`.
pub trait Entity: Default + 'static {
    /// Name used in join column aliases (`Entity__Column`).
    const ENTITY_NAME: &'static str;
    const SCHEMA: &'static str = "dbo";
    const TABLE: &'static str = Self::ENTITY_NAME;

    /// Columns in declaration order.
    fn columns() -> &'static [ColumnDef];

    /// Populate fields from `row`, reading each column as `prefix + name`.
    fn set_values(&mut self, row: &Row, prefix: &str) -> OrmResult<()>;

    /// Field values in [`Entity::columns`] order.
    fn values(&self) -> Vec<Value>;

    /// Field rules checked before every insert and update; no errors by default.
    fn validate(&self) -> ValidationErrors {
        ValidationErrors::default()
    }

    fn hydrate(row: &Row, prefix: &str) -> OrmResult<Self> {
        let mut entity = Self::default();
        entity.set_values(row, prefix)?;
        Ok(entity)
    }

    fn column(name: &str) -> Option<&'static ColumnDef> {
        find_column(Self::columns(), name)
    }

    fn primary_key() -> Option<&'static ColumnDef> {
        Self::columns().iter().find(|c| c.primary_key)
    }
}
