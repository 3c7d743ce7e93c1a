//! Execution adapter traits and the data-access runner.
//!
//! A [`ConnectionFactory`] hands out one [`Connection`] per statement; the
//! connection is dropped when the statement finishes, on every path.
//! [`DataAccess`] wraps a factory with the injection guard, statement tracing
//! and the error-sink policy.

use crate::config::RepositoryConfig;
use crate::error::{OrmError, OrmResult};
use crate::guard;
use crate::literal::quote_text;
use crate::row::Row;
use crate::value::{SqlValue, Value};

/// A named statement parameter (`@Column`).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParam {
    pub name: String,
    pub value: Value,
}

impl NamedParam {
    /// Parameter bound to a column: the name becomes `@column`.
    pub fn for_column(column: &str, value: impl Into<Value>) -> Self {
        Self {
            name: format!("@{column}"),
            value: value.into(),
        }
    }
}

/// A live connection able to run one dialect's statements.
pub trait Connection {
    /// Execute a query and return all rows.
    fn query(&mut self, sql: &str, params: &[NamedParam]) -> OrmResult<Vec<Row>>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[NamedParam]) -> OrmResult<u64>;

    /// Number of columns the database reports for `schema.table`.
    fn column_count(&mut self, schema: &str, table: &str) -> OrmResult<usize> {
        let sql = column_count_sql(schema, table);
        let rows = self.query(&sql, &[])?;
        let cell = rows
            .first()
            .and_then(|row| row.values().first())
            .ok_or_else(|| OrmError::backend("column count query returned no rows"))?;
        i64::from_value(cell)
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| OrmError::backend(format!("invalid column count {cell:?}")))
    }
}

pub(crate) fn column_count_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} AND TABLE_SCHEMA = {}",
        quote_text(table),
        quote_text(schema)
    )
}

/// Source of per-statement connections.
///
/// Implemented for any `Fn() -> OrmResult<C>` closure.
pub trait ConnectionFactory {
    type Conn: Connection;

    fn connect(&self) -> OrmResult<Self::Conn>;
}

impl<F, C> ConnectionFactory for F
where
    F: Fn() -> OrmResult<C>,
    C: Connection,
{
    type Conn = C;

    fn connect(&self) -> OrmResult<C> {
        self()
    }
}

/// Runs statements against a factory under the repository's error policy.
///
/// - The injection guard rejects the statement before any connection is opened;
///   that error propagates.
/// - Backend errors are reported to the configured sink and surface as `Ok(None)`.
pub struct DataAccess<F> {
    factory: F,
    config: RepositoryConfig,
}

impl<F: ConnectionFactory> DataAccess<F> {
    pub fn new(factory: F, config: RepositoryConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn run<T>(
        &self,
        sql: &str,
        param_count: usize,
        op: impl FnOnce(&mut F::Conn) -> OrmResult<T>,
    ) -> OrmResult<Option<T>> {
        guard::check(sql)?;
        self.config.tracer().emit(sql, param_count);

        let result = self.factory.connect().and_then(|mut conn| op(&mut conn));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_backend() => {
                self.config.sink.report(&err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Run a query; `Ok(None)` means the backend failed and the sink was told.
    pub fn query(&self, sql: &str, params: &[NamedParam]) -> OrmResult<Option<Vec<Row>>> {
        self.run(sql, params.len(), |conn| conn.query(sql, params))
    }

    /// Run a statement; `Ok(None)` means the backend failed and the sink was told.
    pub fn execute(&self, sql: &str, params: &[NamedParam]) -> OrmResult<Option<u64>> {
        self.run(sql, params.len(), |conn| conn.execute(sql, params))
    }

    /// Column count of `schema.table`. Backend errors propagate.
    pub fn column_count(&self, schema: &str, table: &str) -> OrmResult<usize> {
        let sql = column_count_sql(schema, table);
        guard::check(&sql)?;
        self.config.tracer().emit(&sql, 0);
        let mut conn = self.factory.connect()?;
        conn.column_count(schema, table)
    }
}
