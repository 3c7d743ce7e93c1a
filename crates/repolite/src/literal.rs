//! T-SQL literal rendering for [`Value`]s.
//!
//! Booleans render as bit literals, numbers bare, everything textual single-quoted
//! with embedded quotes doubled. Values with no literal form (NULL, binary) are
//! rejected instead of being stringified.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Maximum number of literals in one `IN (...)` list.
pub const IN_BATCH_SIZE: usize = 2000;

/// Wrap text in single quotes, doubling embedded quotes.
pub fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Render a scalar value as a SQL literal token.
pub fn format_literal(value: &Value) -> OrmResult<String> {
    match value {
        Value::Null => Err(OrmError::unsupported_type(
            "NULL has no literal form; use IsNull/IsNotNull",
        )),
        Value::Bytes(_) => Err(OrmError::unsupported_type("binary values cannot be rendered as literals")),
        Value::List(_) => Err(OrmError::unsupported_type(
            "a list is only valid as the operand of In/NotIn",
        )),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::UInt(u) => Ok(u.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::Double(d) if !d.is_finite() => {
            Err(OrmError::unsupported_type(format!("non-finite double {d}")))
        }
        Value::Double(d) => Ok(d.to_string()),
        other => other
            .to_text()
            .map(|text| quote_text(&text))
            .ok_or_else(|| OrmError::unsupported_type(other.kind_name())),
    }
}

fn flatten_into(value: &Value, out: &mut Vec<String>) -> OrmResult<()> {
    match value {
        Value::List(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
            Ok(())
        }
        scalar => {
            out.push(format_literal(scalar)?);
            Ok(())
        }
    }
}

/// Render a collection as comma-joined literal batches of at most [`IN_BATCH_SIZE`].
///
/// Nested lists are flattened. An empty collection yields no batches.
pub fn format_list(items: &[Value]) -> OrmResult<Vec<String>> {
    let mut literals = Vec::with_capacity(items.len());
    for item in items {
        flatten_into(item, &mut literals)?;
    }
    Ok(literals
        .chunks(IN_BATCH_SIZE)
        .map(|chunk| chunk.join(", "))
        .collect())
}

/// Remove exactly one pair of outer single quotes, if present.
pub fn strip_quotes(literal: &str) -> &str {
    literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(literal)
}
