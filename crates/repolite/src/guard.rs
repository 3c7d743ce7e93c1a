//! Heuristic rejection of statements carrying comment sequences.
//!
//! Every assembled statement passes through [`check`] before it reaches a
//! connection. This complements literal quoting; it does not replace binding.

use crate::error::{OrmError, OrmResult};

const SUSPECT_SEQUENCES: [&str; 4] = ["--", ";--", "/*", "*/"];

/// Whether `sql` contains a comment sequence once embedded quotes are doubled.
pub fn has_injection(sql: &str) -> bool {
    let escaped = sql.replace('\'', "''");
    SUSPECT_SEQUENCES.iter().any(|seq| escaped.contains(seq))
}

/// Fail with [`OrmError::InjectionSuspected`] when [`has_injection`] matches.
pub fn check(sql: &str) -> OrmResult<()> {
    if has_injection(sql) {
        tracing::warn!(target: "repolite.sql", sql = %sql, "statement rejected by injection guard");
        return Err(OrmError::InjectionSuspected(sql.to_string()));
    }
    Ok(())
}
