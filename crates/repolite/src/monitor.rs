//! Statement tracing and error reporting.
//!
//! Every statement is traced on the `repolite.sql` target before it executes.
//! Backend failures are handed to an [`ErrorSink`] instead of the caller.

use crate::error::OrmError;
use tracing::Level;

/// Truncate to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.len() >= keyword.len()
        && sql.as_bytes()[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// Other SQL (e.g., DDL, PRAGMA)
    Other,
}

impl QueryType {
    /// Detect query type from the leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start();
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

/// Receiver for errors raised by the execution backend.
///
/// The data-access layer reports backend failures here and hands the caller an
/// empty result. Any `Fn(&OrmError)` closure is a sink.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &OrmError);
}

impl<F> ErrorSink for F
where
    F: Fn(&OrmError) + Send + Sync,
{
    fn report(&self, error: &OrmError) {
        self(error)
    }
}

/// Discards every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ErrorSink for NoopSink {
    fn report(&self, _error: &OrmError) {}
}

/// Emits every error as a `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &OrmError) {
        tracing::error!(target: "repolite.sql", error = %error, "statement failed");
    }
}

/// Emits the SQL about to be executed.
#[derive(Debug, Clone)]
pub(crate) struct SqlTracer {
    pub(crate) level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub(crate) max_sql_length: Option<usize>,
}

impl SqlTracer {
    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn emit(&self, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "repolite.sql",
            query_type = ?QueryType::from_sql(&sql),
            param_count,
            sql = %sql,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn query_type_reads_leading_keyword() {
        assert_eq!(QueryType::from_sql("  select 1"), QueryType::Select);
        assert_eq!(QueryType::from_sql("INSERT INTO [t]"), QueryType::Insert);
        assert_eq!(QueryType::from_sql("DELETE FROM [t]"), QueryType::Delete);
        assert_eq!(QueryType::from_sql("UPDATEx"), QueryType::Other);
        assert_eq!(QueryType::from_sql("PRAGMA table_info(t)"), QueryType::Other);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("abc", 10), "abc");
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: &OrmError| seen.lock().unwrap().push(e.to_string());
        sink.report(&OrmError::backend("boom"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
