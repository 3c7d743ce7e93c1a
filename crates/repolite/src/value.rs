//! Runtime values and the Rust-type ↔ SQL-type mapping.
//!
//! [`Value`] is the single currency of the crate: predicate operands, bound
//! parameters and result-set cells all travel as `Value`. [`SqlValue`] maps a Rust
//! field type to its semantic [`ValueType`], its dialect tag [`SqlDbType`] and its
//! column type text, and converts to and from `Value`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use uuid::Uuid;

/// Semantic value type of a column or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Decimal,
    Double,
    String,
    Char,
    DateTime,
    DateTimeOffset,
    Guid,
    TimeSpan,
    /// Markup document; compared through its text form.
    Xml,
    Bytes,
}

impl ValueType {
    /// Numeric types accepted by ordering comparisons.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Byte
                | ValueType::Int16
                | ValueType::UInt16
                | ValueType::Int32
                | ValueType::UInt32
                | ValueType::Int64
                | ValueType::UInt64
                | ValueType::Decimal
                | ValueType::Double
        )
    }

    /// Document/markup types that must be cast to text before comparison.
    pub fn is_text_cast(self) -> bool {
        matches!(self, ValueType::Xml)
    }

}

/// SQL Server type tag of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDbType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Float,
    NVarChar,
    NChar,
    DateTime,
    DateTimeOffset,
    UniqueIdentifier,
    Time,
    Xml,
    VarBinary,
}

/// Markup document stored in an XML column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Xml(pub String);

impl Xml {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The document text.
    pub fn inner_xml(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Xml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A runtime SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Decimal(Decimal),
    Double(f64),
    String(String),
    Char(char),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    TimeSpan(TimeDelta),
    Xml(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    /// Semantic type of this value; `None` for NULL and lists.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Null | Value::List(_) => return None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int64,
            Value::UInt(_) => ValueType::UInt64,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Char(_) => ValueType::Char,
            Value::DateTime(_) => ValueType::DateTime,
            Value::DateTimeOffset(_) => ValueType::DateTimeOffset,
            Value::Guid(_) => ValueType::Guid,
            Value::TimeSpan(_) => ValueType::TimeSpan,
            Value::Xml(_) => ValueType::Xml,
            Value::Bytes(_) => ValueType::Bytes,
        })
    }

    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Char(_) => "char",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::Guid(_) => "guid",
            Value::TimeSpan(_) => "timespan",
            Value::Xml(_) => "xml",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is numeric, or text that parses as a number.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) | Value::UInt(_) | Value::Decimal(_) => true,
            Value::Double(d) => d.is_finite(),
            Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
            _ => false,
        }
    }

    /// Unquoted text form of a scalar value; `None` for NULL, bytes and lists.
    pub fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Null | Value::Bytes(_) | Value::List(_) => return None,
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) | Value::Xml(s) => s.clone(),
            Value::Char(c) => c.to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            Value::DateTimeOffset(dt) => dt.format(DATETIME_OFFSET_FORMAT).to_string(),
            Value::Guid(g) => g.hyphenated().to_string(),
            Value::TimeSpan(ts) => format_timespan(ts),
        })
    }
}

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
pub(crate) const DATETIME_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Render a time span as `[-][d.]hh:mm:ss[.fffffff]`.
pub fn format_timespan(ts: &TimeDelta) -> String {
    let negative = *ts < TimeDelta::zero();
    let abs = ts.abs();
    let total = abs.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let ticks = abs.subsec_nanos() / 100;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

/// Parse a time span rendered by [`format_timespan`] (or SQL Server `TIME` text).
pub fn parse_timespan(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut clock = text.split(':');
    let (first, minutes, rest) = (clock.next()?, clock.next()?, clock.next()?);
    if clock.next().is_some() {
        return None;
    }

    let (days, hours) = match first.split_once('.') {
        Some((d, h)) => (d.parse::<i64>().ok()?, h.parse::<i64>().ok()?),
        None => (0, first.parse::<i64>().ok()?),
    };
    let minutes = minutes.parse::<i64>().ok()?;
    let (seconds, nanos) = match rest.split_once('.') {
        Some((s, frac)) => {
            let digits: String = frac.chars().take(9).collect();
            let padded = format!("{digits:0<9}");
            (s.parse::<i64>().ok()?, padded.parse::<i64>().ok()?)
        }
        None => (rest.parse::<i64>().ok()?, 0),
    };

    let span = TimeDelta::try_days(days)?
        .checked_add(&TimeDelta::try_hours(hours)?)?
        .checked_add(&TimeDelta::try_minutes(minutes)?)?
        .checked_add(&TimeDelta::try_seconds(seconds)?)?
        .checked_add(&TimeDelta::nanoseconds(nanos))?;
    Some(if negative { -span } else { span })
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_datetime_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, DATETIME_OFFSET_FORMAT))
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %:z"))
        .ok()
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, got {}", got.kind_name())
}

fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Int(i) => Some(i128::from(*i)),
        Value::UInt(u) => Some(i128::from(*u)),
        Value::Bool(b) => Some(i128::from(*b)),
        Value::Decimal(d) if d.fract().is_zero() => d.to_i128(),
        Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i128),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

/// Mapping between a Rust field type and its SQL representation.
///
/// Implemented for every supported scalar and for `Option<T>`, which marks a
/// column nullable. `#[derive(Entity)]` reads the associated constants to build
/// column metadata.
pub trait SqlValue: Sized {
    /// Semantic value type.
    const VALUE_TYPE: ValueType;
    /// Dialect type tag.
    const DB_TYPE: SqlDbType;
    /// Column type text (e.g. `[INT]`).
    const SQL_TYPE_TEXT: &'static str;
    /// Whether the column accepts NULL.
    const NULLABLE: bool = false;

    /// Convert to a runtime value.
    fn to_value(&self) -> Value;

    /// Convert from a runtime value, returning a message on mismatch.
    fn from_value(value: &Value) -> Result<Self, String>;
}

macro_rules! impl_sql_integer {
    ($($ty:ty => $vt:ident, $db:ident, $text:literal, $variant:ident;)*) => {
        $(
            impl SqlValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$vt;
                const DB_TYPE: SqlDbType = SqlDbType::$db;
                const SQL_TYPE_TEXT: &'static str = $text;

                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Result<Self, String> {
                    as_i128(value)
                        .and_then(|i| <$ty>::try_from(i).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), value))
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_sql_integer! {
    u8 => Byte, TinyInt, "[TINYINT]", Int;
    i16 => Int16, SmallInt, "[SMALLINT]", Int;
    u16 => UInt16, Int, "[INT]", Int;
    i32 => Int32, Int, "[INT]", Int;
    u32 => UInt32, BigInt, "[BIGINT]", Int;
    i64 => Int64, BigInt, "[BIGINT]", Int;
    u64 => UInt64, Decimal, "[DECIMAL](20, 0)", UInt;
}

impl SqlValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;
    const DB_TYPE: SqlDbType = SqlDbType::Bit;
    const SQL_TYPE_TEXT: &'static str = "[BIT]";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(mismatch("bool", value)),
            },
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl SqlValue for Decimal {
    const VALUE_TYPE: ValueType = ValueType::Decimal;
    const DB_TYPE: SqlDbType = SqlDbType::Decimal;
    const SQL_TYPE_TEXT: &'static str = "[DECIMAL](18, 4)";

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::UInt(u) => Ok(Decimal::from(*u)),
            Value::Double(d) => Decimal::try_from(*d).map_err(|e| e.to_string()),
            Value::String(s) => s.trim().parse::<Decimal>().map_err(|e| e.to_string()),
            _ => Err(mismatch("decimal", value)),
        }
    }
}

impl SqlValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;
    const DB_TYPE: SqlDbType = SqlDbType::Float;
    const SQL_TYPE_TEXT: &'static str = "[FLOAT]";

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Int(i) => Ok(*i as f64),
            Value::UInt(u) => Ok(*u as f64),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| mismatch("f64", value)),
            Value::String(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl SqlValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;
    const DB_TYPE: SqlDbType = SqlDbType::NVarChar;
    const SQL_TYPE_TEXT: &'static str = "[NVARCHAR](MAX)";

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) | Value::Xml(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
            other => other.to_text().ok_or_else(|| mismatch("string", other)),
        }
    }
}

impl SqlValue for char {
    const VALUE_TYPE: ValueType = ValueType::Char;
    const DB_TYPE: SqlDbType = SqlDbType::NChar;
    const SQL_TYPE_TEXT: &'static str = "[NCHAR](1)";

    fn to_value(&self) -> Value {
        Value::Char(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Char(c) => Ok(*c),
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(format!("expected a single character, got {s:?}")),
                }
            }
            _ => Err(mismatch("char", value)),
        }
    }
}

impl SqlValue for NaiveDateTime {
    const VALUE_TYPE: ValueType = ValueType::DateTime;
    const DB_TYPE: SqlDbType = SqlDbType::DateTime;
    const SQL_TYPE_TEXT: &'static str = "[DATETIME]";

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::DateTimeOffset(dt) => Ok(dt.naive_local()),
            Value::String(s) => parse_datetime(s).ok_or_else(|| format!("invalid datetime {s:?}")),
            _ => Err(mismatch("datetime", value)),
        }
    }
}

impl SqlValue for DateTime<FixedOffset> {
    const VALUE_TYPE: ValueType = ValueType::DateTimeOffset;
    const DB_TYPE: SqlDbType = SqlDbType::DateTimeOffset;
    const SQL_TYPE_TEXT: &'static str = "[DATETIMEOFFSET]";

    fn to_value(&self) -> Value {
        Value::DateTimeOffset(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::DateTimeOffset(dt) => Ok(*dt),
            Value::String(s) => {
                parse_datetime_offset(s).ok_or_else(|| format!("invalid datetimeoffset {s:?}"))
            }
            _ => Err(mismatch("datetimeoffset", value)),
        }
    }
}

impl SqlValue for Uuid {
    const VALUE_TYPE: ValueType = ValueType::Guid;
    const DB_TYPE: SqlDbType = SqlDbType::UniqueIdentifier;
    const SQL_TYPE_TEXT: &'static str = "[UNIQUEIDENTIFIER]";

    fn to_value(&self) -> Value {
        Value::Guid(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Guid(g) => Ok(*g),
            Value::String(s) => Uuid::parse_str(s.trim()).map_err(|e| e.to_string()),
            Value::Bytes(b) => Uuid::from_slice(b).map_err(|e| e.to_string()),
            _ => Err(mismatch("guid", value)),
        }
    }
}

impl SqlValue for TimeDelta {
    const VALUE_TYPE: ValueType = ValueType::TimeSpan;
    const DB_TYPE: SqlDbType = SqlDbType::Time;
    const SQL_TYPE_TEXT: &'static str = "[TIME]";

    fn to_value(&self) -> Value {
        Value::TimeSpan(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::TimeSpan(ts) => Ok(*ts),
            Value::String(s) => parse_timespan(s).ok_or_else(|| format!("invalid timespan {s:?}")),
            _ => Err(mismatch("timespan", value)),
        }
    }
}

impl SqlValue for Xml {
    const VALUE_TYPE: ValueType = ValueType::Xml;
    const DB_TYPE: SqlDbType = SqlDbType::Xml;
    const SQL_TYPE_TEXT: &'static str = "[XML]";

    fn to_value(&self) -> Value {
        Value::Xml(self.0.clone())
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Xml(s) | Value::String(s) => Ok(Xml(s.clone())),
            _ => Err(mismatch("xml", value)),
        }
    }
}

impl SqlValue for Vec<u8> {
    const VALUE_TYPE: ValueType = ValueType::Bytes;
    const DB_TYPE: SqlDbType = SqlDbType::VarBinary;
    const SQL_TYPE_TEXT: &'static str = "[VARBINARY](MAX)";

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => Ok(s.clone().into_bytes()),
            _ => Err(mismatch("bytes", value)),
        }
    }
}

impl<T: SqlValue> SqlValue for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const DB_TYPE: SqlDbType = T::DB_TYPE;
    const SQL_TYPE_TEXT: &'static str = T::SQL_TYPE_TEXT;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ── Value conversions ───────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::DateTime(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTimeOffset(v.fixed_offset())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<TimeDelta> for Value {
    fn from(v: TimeDelta) -> Self {
        Value::TimeSpan(v)
    }
}

impl From<Xml> for Value {
    fn from(v: Xml) -> Self {
        Value::Xml(v.0)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
