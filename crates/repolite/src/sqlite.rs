//! Reference execution adapter over SQLite.
//!
//! SQLite accepts bracket-quoted identifiers and string-literal column aliases,
//! so generated statements run unchanged apart from two dialect shims: text casts
//! become `CAST(... AS TEXT)` and column counts read `PRAGMA table_info`.
//! Schemas (e.g. `dbo`) are separate database files attached on every connection.

use crate::client::{Connection, ConnectionFactory, NamedParam};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ToSql, params};
use serde::Deserialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A database file attached under a schema name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachedDatabase {
    pub schema: String,
    pub path: PathBuf,
}

/// Connection settings for [`SqliteAccess`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Main database file, or `:memory:`.
    pub path: PathBuf,
    pub attach: Vec<AttachedDatabase>,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            attach: Vec::new(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Attach `path` as `schema` on every connection.
    pub fn attach(mut self, schema: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attach.push(AttachedDatabase {
            schema: schema.into(),
            path: path.into(),
        });
        self
    }

    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Connection factory opening one SQLite connection per statement.
#[derive(Debug, Clone)]
pub struct SqliteAccess {
    config: SqliteConfig,
}

impl SqliteAccess {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run a batch of statements (setup scripts, DDL) on a fresh connection.
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        let conn = self.connect()?;
        conn.conn.execute_batch(sql)?;
        Ok(())
    }

    fn open(path: &Path) -> rusqlite::Result<rusqlite::Connection> {
        if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
    }
}

impl ConnectionFactory for SqliteAccess {
    type Conn = SqliteConnection;

    fn connect(&self) -> OrmResult<SqliteConnection> {
        let conn = Self::open(&self.config.path)?;
        conn.busy_timeout(std::time::Duration::from_millis(self.config.busy_timeout_ms))?;
        for db in &self.config.attach {
            conn.execute(
                "ATTACH DATABASE ?1 AS ?2",
                params![db.path.to_string_lossy(), db.schema],
            )?;
        }
        debug!(
            target: "repolite.sqlite",
            path = ?self.config.path,
            attached = self.config.attach.len(),
            "opened connection"
        );
        Ok(SqliteConnection { conn })
    }
}

/// One open SQLite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

fn bind(params: &[NamedParam]) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|p| (p.name.as_str(), &p.value as &dyn ToSql))
        .collect()
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[NamedParam]) -> OrmResult<Vec<Row>> {
        let sql = to_sqlite_dialect(sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let bound = bind(params);
        let mut rows = stmt.query(bound.as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..width)
                .map(|i| row.get_ref(i).map_err(OrmError::from).and_then(read_value))
                .collect::<OrmResult<Vec<_>>>()?;
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn execute(&mut self, sql: &str, params: &[NamedParam]) -> OrmResult<u64> {
        let sql = to_sqlite_dialect(sql);
        let bound = bind(params);
        let affected = self.conn.execute(&sql, bound.as_slice())?;
        Ok(affected as u64)
    }

    fn column_count(&mut self, schema: &str, table: &str) -> OrmResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1, ?2)",
            params![table, schema],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|e| OrmError::backend(e.to_string()))
    }
}

fn read_value(cell: ValueRef<'_>) -> OrmResult<Value> {
    Ok(match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => Value::String(
            std::str::from_utf8(bytes)
                .map_err(|e| OrmError::backend(format!("invalid UTF-8 in text cell: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::UInt(u) => match i64::try_from(*u) {
                Ok(i) => ToSqlOutput::Owned(Sql::Integer(i)),
                Err(_) => ToSqlOutput::Owned(Sql::Text(u.to_string())),
            },
            Value::Double(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::String(s) | Value::Xml(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "list values cannot be bound as a parameter".into(),
                ));
            }
            other => match other.to_text() {
                Some(text) => ToSqlOutput::Owned(Sql::Text(text)),
                None => ToSqlOutput::Owned(Sql::Null),
            },
        })
    }
}

const TEXT_CAST: &str = "CONVERT(NVARCHAR(MAX), ";

/// Byte offset of the `)` closing a bracket-quoted operand.
fn operand_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_brackets = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' if !in_brackets => in_brackets = true,
            b']' if in_brackets => {
                if bytes.get(i + 1) == Some(&b']') {
                    i += 1;
                } else {
                    in_brackets = false;
                }
            }
            b')' if !in_brackets => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Rewrite the T-SQL constructs repolite emits into their SQLite forms.
pub(crate) fn to_sqlite_dialect(sql: &str) -> Cow<'_, str> {
    let sql = rewrite_text_casts(sql);
    match output_to_returning(&sql) {
        Some(rewritten) => Cow::Owned(rewritten),
        None => sql,
    }
}

const OUTPUT: &str = " OUTPUT ";
const INSERTED: &str = "[Inserted].";
const VALUES: &str = " VALUES (";

/// `INSERT INTO t (..) OUTPUT [Inserted].[k] VALUES (..)` becomes
/// `INSERT INTO t (..) VALUES (..) RETURNING [k]`.
fn output_to_returning(sql: &str) -> Option<String> {
    if !sql.starts_with("INSERT INTO ") {
        return None;
    }
    let start = sql.find(OUTPUT)?;
    let after = &sql[start + OUTPUT.len()..];
    let values = after.find(VALUES)?;
    let returning = after[..values].replace(INSERTED, "");
    Some(format!("{}{} RETURNING {returning}", &sql[..start], &after[values..]))
}

/// Rewrite T-SQL text casts into SQLite `CAST(... AS TEXT)`.
fn rewrite_text_casts(sql: &str) -> Cow<'_, str> {
    if !sql.contains(TEXT_CAST) {
        return Cow::Borrowed(sql);
    }
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(start) = rest.find(TEXT_CAST) {
        let after = &rest[start + TEXT_CAST.len()..];
        let Some(end) = operand_end(after) else {
            return Cow::Borrowed(sql);
        };
        out.push_str(&rest[..start]);
        out.push_str("CAST(");
        out.push_str(&after[..end]);
        out.push_str(" AS TEXT)");
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_casts_are_rewritten() {
        assert_eq!(
            to_sqlite_dialect("CONVERT(NVARCHAR(MAX), [Body]) LIKE '%a%'"),
            "CAST([Body] AS TEXT) LIKE '%a%'"
        );
        assert_eq!(
            to_sqlite_dialect("CONVERT(NVARCHAR(MAX), [c0].[a)]]b]) = 1 OR CONVERT(NVARCHAR(MAX), [x]) = 2"),
            "CAST([c0].[a)]]b] AS TEXT) = 1 OR CAST([x] AS TEXT) = 2"
        );
        assert!(matches!(to_sqlite_dialect("SELECT 1"), Cow::Borrowed(_)));
    }

    #[test]
    fn insert_output_becomes_returning() {
        assert_eq!(
            to_sqlite_dialect(
                "INSERT INTO [dbo].[T] ([Name]) OUTPUT [Inserted].[Id], [Inserted].[Code] VALUES (@Name)"
            ),
            "INSERT INTO [dbo].[T] ([Name]) VALUES (@Name) RETURNING [Id], [Code]"
        );
        assert!(matches!(
            to_sqlite_dialect("INSERT INTO [dbo].[T] ([Name]) VALUES (@Name)"),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            to_sqlite_dialect("SELECT [c0].[Id] AS ' OUTPUT ' FROM [dbo].[T] c0"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SqliteConfig = serde::de::Deserialize::deserialize(
            serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
                [("busy_timeout_ms", 10u64)].into_iter(),
            ),
        )
        .unwrap();
        assert_eq!(config.busy_timeout_ms, 10);
        assert_eq!(config.path, PathBuf::from(":memory:"));
    }

    #[test]
    fn values_round_trip_through_sqlite() {
        let access = SqliteAccess::new(SqliteConfig::default());
        let mut conn = access.connect().unwrap();
        let rows = conn
            .query(
                "SELECT @a AS a, @b AS b, @c AS c",
                &[
                    NamedParam::for_column("a", 5),
                    NamedParam::for_column("b", "x"),
                    NamedParam::for_column("c", Value::Null),
                ],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), ["a", "b", "c"]);
        assert_eq!(rows[0].values(), [Value::Int(5), Value::from("x"), Value::Null]);
    }
}
