//! Convenient imports for typical `repolite` usage.
//!
//! ```ignore
//! use repolite::prelude::*;
//! ```

pub use crate::{
    Comparison, Entity, Expr, FindComparison, JoinKind, OrmError, OrmResult, Param, Repository,
    RepositoryConfig, Row, SqlValue, ValidationErrors, Value, Xml,
};

#[cfg(feature = "sqlite")]
pub use crate::{SqliteAccess, SqliteConfig};
