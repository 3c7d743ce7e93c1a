//! Single-table repository over an [`Entity`].
//!
//! ```ignore
//! let users = Repository::<User, _>::new(factory, RepositoryConfig::new())?;
//!
//! let adults = users
//!     .where_("Age", Comparison::GreaterThanOrEquals, 18)
//!     .and_begin_group_null("Email", Comparison::IsNotNull)
//!     .or("Verified", Comparison::Equals, true)
//!     .end_group()
//!     .results()?;
//!
//! let named = users.filter(|u| u.col("Name").starts_with("A"))?;
//! let recent = users.find_by("Id", FindComparison::GreaterThan, 100)?;
//!
//! let keys = users.create(&User { name: "Ada".into(), ..Default::default() })?;
//! let id: Option<i32> = keys.map(|row| row.try_get("Id")).transpose()?;
//! ```

use crate::builder::{Comparison, FindComparison, WhereClause};
use crate::client::{ConnectionFactory, DataAccess, NamedParam};
use crate::config::RepositoryConfig;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, Param, XRef, translate_predicate};
use crate::ident::{quote_ident, qualified_table};
use crate::join::{EntityMeta, JoinChain, JoinKind, PendingJoin};
use crate::row::{Entity, Row};
use crate::value::{SqlValue, Value};
use std::marker::PhantomData;

/// Data access for one entity type.
pub struct Repository<E, F> {
    access: DataAccess<F>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, F: ConnectionFactory> Repository<E, F> {
    /// Create a repository, checking that the table still has as many columns
    /// as `E` declares (unless disabled in `config`).
    pub fn new(factory: F, config: RepositoryConfig) -> OrmResult<Self> {
        let access = DataAccess::new(factory, config);
        if access.config().validates_schema() {
            let expected = E::columns().len();
            let actual = access.column_count(E::SCHEMA, E::TABLE)?;
            if actual != expected {
                return Err(OrmError::SchemaMismatch {
                    schema: E::SCHEMA.to_string(),
                    table: E::TABLE.to_string(),
                    expected,
                    actual,
                });
            }
        }
        tracing::debug!(
            target: "repolite.sql",
            entity = E::ENTITY_NAME,
            table = %Self::table(),
            "repository ready"
        );
        Ok(Self {
            access,
            _entity: PhantomData,
        })
    }

    pub fn access(&self) -> &DataAccess<F> {
        &self.access
    }

    /// `[schema].[table]`.
    pub fn table() -> String {
        qualified_table(E::SCHEMA, E::TABLE)
    }

    /// `SELECT [a], [b], ... FROM [schema].[table]`.
    pub fn select_sql() -> String {
        let columns: Vec<String> = E::columns().iter().map(|c| quote_ident(c.name)).collect();
        format!("SELECT {} FROM {}", columns.join(", "), Self::table())
    }

    fn fetch(&self, sql: &str) -> OrmResult<Vec<E>> {
        let Some(rows) = self.access.query(sql, &[])? else {
            return Ok(Vec::new());
        };
        rows.iter().map(|row: &Row| E::hydrate(row, "")).collect()
    }

    /// Number of rows in the table; 0 when the backend fails.
    pub fn record_count(&self) -> OrmResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", Self::table());
        let Some(rows) = self.access.query(&sql, &[])? else {
            return Ok(0);
        };
        match rows.first().and_then(|r| r.values().first()) {
            Some(cell) => i64::from_value(cell).map_err(|m| OrmError::decode("COUNT(*)", m)),
            None => Ok(0),
        }
    }

    pub fn get_all(&self) -> OrmResult<Vec<E>> {
        self.fetch(&Self::select_sql())
    }

    /// Start a fluent WHERE clause.
    pub fn where_(&self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Where<'_, E, F> {
        let mut clause = WhereClause::for_columns(E::columns());
        clause.start(column, comparison, value);
        Where { repo: self, clause }
    }

    /// Start a fluent WHERE clause with a null check.
    pub fn where_null(&self, column: &str, comparison: Comparison) -> Where<'_, E, F> {
        let mut clause = WhereClause::for_columns(E::columns());
        clause.start_null(column, comparison);
        Where { repo: self, clause }
    }

    /// Rows matching a raw clause (subject to the injection guard).
    pub fn where_raw(&self, clause: &str) -> OrmResult<Vec<E>> {
        self.fetch(&format!("{} WHERE {clause}", Self::select_sql()))
    }

    /// Rows matching a typed predicate over the entity.
    pub fn filter(&self, predicate: impl FnOnce(&Param) -> Expr) -> OrmResult<Vec<E>> {
        let param = Param::of::<E>(0);
        let clause = translate_predicate(&predicate(&param), &XRef::new())?;
        self.where_raw(&clause)
    }

    /// Rows whose `column` compares to `value`.
    pub fn find_by(
        &self,
        column: &str,
        comparison: FindComparison,
        value: impl Into<Value>,
    ) -> OrmResult<Vec<E>> {
        self.where_(column, comparison.into(), value).results()
    }

    /// Rows equal on every `(column, value)` pair; no criteria means no rows.
    pub fn search(&self, criteria: &[(&str, Value)]) -> OrmResult<Vec<E>> {
        let Some(((first_col, first_val), rest)) = criteria.split_first() else {
            return Ok(Vec::new());
        };
        let mut clause = WhereClause::for_columns(E::columns());
        clause.start(first_col, Comparison::Equals, first_val);
        for (column, value) in rest {
            clause.and(column, Comparison::Equals, value);
        }
        self.where_raw(&clause.to_clause()?)
    }

    /// Refuse entities whose own field rules fail.
    fn check_valid(entity: &E) -> OrmResult<()> {
        let errors = entity.validate();
        if errors.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            target: "repolite.sql",
            entity = E::ENTITY_NAME,
            errors = errors.len(),
            "entity rejected before write"
        );
        Err(OrmError::InvalidEntity {
            entity: E::ENTITY_NAME,
            errors,
        })
    }

    /// Insert one entity; identity columns are left to the database.
    ///
    /// Returns the primary-key columns of the inserted row as the database
    /// stored them (an empty row when `E` declares no key), or `None` when
    /// nothing was inserted.
    pub fn create(&self, entity: &E) -> OrmResult<Option<Row>> {
        Self::check_valid(entity)?;
        self.insert(entity)
    }

    fn insert(&self, entity: &E) -> OrmResult<Option<Row>> {
        let (names, params): (Vec<String>, Vec<NamedParam>) = E::columns()
            .iter()
            .zip(entity.values())
            .filter(|(col, _)| !col.identity)
            .map(|(col, value)| (quote_ident(col.name), NamedParam::for_column(col.name, value)))
            .unzip();
        let placeholders: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();

        let keys: Vec<String> = E::columns()
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| format!("[Inserted].{}", quote_ident(c.name)))
            .collect();
        let output = if keys.is_empty() {
            String::new()
        } else {
            format!(" OUTPUT {}", keys.join(", "))
        };

        let sql = format!(
            "INSERT INTO {} ({}){output} VALUES ({})",
            Self::table(),
            names.join(", "),
            placeholders.join(", ")
        );

        if keys.is_empty() {
            let inserted = self.access.execute(&sql, &params)?.is_some_and(|n| n > 0);
            return Ok(inserted.then(|| Row::from_pairs(Vec::<(String, Value)>::new())));
        }
        Ok(self
            .access
            .query(&sql, &params)?
            .and_then(|rows| rows.into_iter().next()))
    }

    /// Insert each entity; returns how many were inserted.
    ///
    /// Every entity is validated before the first insert runs.
    pub fn bulk_create(&self, entities: &[E]) -> OrmResult<usize> {
        for entity in entities {
            Self::check_valid(entity)?;
        }
        let mut created = 0;
        for entity in entities {
            if self.insert(entity)?.is_some() {
                created += 1;
            }
        }
        Ok(created)
    }

    fn key_param(entity: &E) -> OrmResult<(&'static str, NamedParam)> {
        let (index, key) = E::columns()
            .iter()
            .enumerate()
            .find(|(_, c)| c.primary_key)
            .ok_or_else(|| OrmError::validation(format!("{} declares no primary key", E::ENTITY_NAME)))?;
        let value = entity.values().into_iter().nth(index).unwrap_or(Value::Null);
        Ok((key.name, NamedParam::for_column(key.name, value)))
    }

    /// Update every non-key column of the row with the entity's primary key.
    pub fn update(&self, entity: &E) -> OrmResult<bool> {
        let columns: Vec<&str> = E::columns()
            .iter()
            .filter(|c| !c.primary_key && !c.identity)
            .map(|c| c.name)
            .collect();
        self.update_columns(entity, &columns)
    }

    /// Update only the named columns of the row with the entity's primary key.
    ///
    /// Unknown names and key or identity columns are rejected before anything runs.
    pub fn update_columns(&self, entity: &E, columns: &[&str]) -> OrmResult<bool> {
        Self::check_valid(entity)?;
        let (key, key_param) = Self::key_param(entity)?;
        if columns.is_empty() {
            return Err(OrmError::validation(format!(
                "{} has no updatable columns",
                E::ENTITY_NAME
            )));
        }

        let mut values: Vec<Option<Value>> = entity.values().into_iter().map(Some).collect();
        let mut assignments = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len() + 1);
        for name in columns {
            let index = E::columns()
                .iter()
                .position(|c| c.name == *name)
                .ok_or_else(|| {
                    OrmError::validation(format!("{} has no column `{name}`", E::ENTITY_NAME))
                })?;
            let col = &E::columns()[index];
            if col.primary_key || col.identity {
                return Err(OrmError::validation(format!(
                    "{}.{} is a key column and cannot be updated",
                    E::ENTITY_NAME,
                    col.name
                )));
            }
            let value = values
                .get_mut(index)
                .and_then(Option::take)
                .ok_or_else(|| OrmError::validation(format!("column `{name}` listed twice")))?;
            assignments.push(format!("{} = @{}", quote_ident(col.name), col.name));
            params.push(NamedParam::for_column(col.name, value));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = @{key}",
            Self::table(),
            assignments.join(", "),
            quote_ident(key)
        );
        params.push(key_param);
        Ok(self.access.execute(&sql, &params)?.is_some_and(|n| n > 0))
    }

    /// Delete the row with the entity's primary key.
    pub fn delete(&self, entity: &E) -> OrmResult<bool> {
        let (key, key_param) = Self::key_param(entity)?;
        let sql = format!("DELETE FROM {} WHERE {} = @{key}", Self::table(), quote_ident(key));
        Ok(self.access.execute(&sql, &[key_param])?.is_some_and(|n| n > 0))
    }

    /// Delete every row whose `column` is in `values`; returns rows affected.
    pub fn delete_many(&self, column: &str, values: impl Into<Value>) -> OrmResult<u64> {
        let mut clause = WhereClause::for_columns(E::columns());
        clause.start(column, Comparison::In, values);
        let sql = format!("DELETE FROM {} WHERE {}", Self::table(), clause.to_clause()?);
        Ok(self.access.execute(&sql, &[])?.unwrap_or(0))
    }

    /// An empty join chain rooted at this entity.
    pub fn join_chain(&self) -> JoinChain<'_, F> {
        JoinChain::new(&self.access, EntityMeta::of::<E>())
    }

    pub fn add_join(&self, meta: EntityMeta, kind: JoinKind) -> PendingJoin<'_, F> {
        self.join_chain().add_join(meta, kind)
    }

    pub fn inner_join<J: Entity>(&self) -> PendingJoin<'_, F> {
        self.join_chain().inner_join::<J>()
    }

    pub fn left_join<J: Entity>(&self) -> PendingJoin<'_, F> {
        self.join_chain().left_join::<J>()
    }

    pub fn right_join<J: Entity>(&self) -> PendingJoin<'_, F> {
        self.join_chain().right_join::<J>()
    }

    pub fn full_join<J: Entity>(&self) -> PendingJoin<'_, F> {
        self.join_chain().full_join::<J>()
    }
}

/// A WHERE clause bound to its repository.
pub struct Where<'r, E, F> {
    repo: &'r Repository<E, F>,
    clause: WhereClause,
}

impl<E: Entity, F: ConnectionFactory> Where<'_, E, F> {
    pub fn and(mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.clause.and(column, comparison, value);
        self
    }

    pub fn or(mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.clause.or(column, comparison, value);
        self
    }

    pub fn and_null(mut self, column: &str, comparison: Comparison) -> Self {
        self.clause.and_null(column, comparison);
        self
    }

    pub fn or_null(mut self, column: &str, comparison: Comparison) -> Self {
        self.clause.or_null(column, comparison);
        self
    }

    pub fn and_begin_group(mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.clause.and_begin_group(column, comparison, value);
        self
    }

    pub fn or_begin_group(mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.clause.or_begin_group(column, comparison, value);
        self
    }

    pub fn and_begin_group_null(mut self, column: &str, comparison: Comparison) -> Self {
        self.clause.and_begin_group_null(column, comparison);
        self
    }

    pub fn or_begin_group_null(mut self, column: &str, comparison: Comparison) -> Self {
        self.clause.or_begin_group_null(column, comparison);
        self
    }

    pub fn end_group(mut self) -> Self {
        self.clause.end_group();
        self
    }

    pub fn clause(&self) -> &WhereClause {
        &self.clause
    }

    /// The full SELECT statement.
    pub fn query_string(&self) -> OrmResult<String> {
        Ok(format!(
            "{} WHERE {}",
            Repository::<E, F>::select_sql(),
            self.clause.to_clause()?
        ))
    }

    /// Execute the query.
    pub fn results(&self) -> OrmResult<Vec<E>> {
        self.repo.fetch(&self.query_string()?)
    }
}
