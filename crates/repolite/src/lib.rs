//! # repolite
//!
//! Typed query construction for generated SQL Server repositories.
//!
//! ## Features
//!
//! - **Literal rendering**: values become dialect-correct T-SQL literals, quotes doubled
//! - **Fluent WHERE builder**: AND/OR chains with nested groups and batched `IN` lists
//! - **Predicate translation**: typed [`Expr`] trees compile to boolean SQL expressions
//! - **Joins**: N-way join chains with per-entity row demultiplexing
//! - **Injection guard**: every statement is screened before it reaches a connection
//! - **Error sink**: backend failures are reported, callers get empty results
//!
//! ## Quick start
//!
//! ```ignore
//! use repolite::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "Users")]
//! struct User {
//!     #[orm(id, identity)]
//!     id: i32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let access = SqliteAccess::new(SqliteConfig::new(":memory:").attach("dbo", "dbo.db"));
//! let users = Repository::<User, _>::new(access, RepositoryConfig::new())?;
//!
//! let found = users.where_("Name", Comparison::Like, "ada").results()?;
//! let active = users.filter(|u| u.col("Active").and(u.col("Id").gt(10)))?;
//! ```

// Lets `#[derive(Entity)]` expand to `::repolite::...` paths inside this crate.
extern crate self as repolite;

pub mod builder;
pub mod changeset;
pub mod client;
pub mod column;
pub mod config;
pub mod error;
pub mod expr;
pub mod guard;
pub mod ident;
pub mod join;
pub mod literal;
pub mod monitor;
pub mod prelude;
pub mod repository;
pub mod row;
pub mod value;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use builder::{ClauseType, Comparison, FindComparison, WhereClause};
pub use changeset::{ValidationCode, ValidationError, ValidationErrors};
pub use client::{Connection, ConnectionFactory, DataAccess, NamedParam};
pub use column::ColumnDef;
pub use config::RepositoryConfig;
pub use error::{OrmError, OrmResult};
pub use expr::{BinaryOp, Expr, IntoExpr, Param, UnaryOp, XRef, translate, translate_predicate};
pub use join::{EntityMeta, JoinChain, JoinKind, JoinScope, JoinStep, JoinedRow, PendingJoin};
pub use literal::{IN_BATCH_SIZE, format_list, format_literal};
pub use monitor::{ErrorSink, NoopSink, QueryType, TracingSink};
pub use repository::{Repository, Where};
pub use row::{Entity, Row};
pub use value::{SqlDbType, SqlValue, Value, ValueType, Xml};

#[cfg(feature = "sqlite")]
pub use sqlite::{AttachedDatabase, SqliteAccess, SqliteConfig, SqliteConnection};

#[cfg(feature = "derive")]
pub use repolite_derive::Entity;
