//! Multi-entity join composition and row demultiplexing.
//!
//! A chain starts at a repository's entity (alias `c0`); every join appends the
//! next alias (`c1`, `c2`, ...) and must receive its ON predicate before the
//! chain can be extended or executed:
//!
//! ```ignore
//! let rows = orders
//!     .inner_join::<Customer>()
//!     .on(|s| s.at(0).col("CustomerId").eq(s.at(1).col("Id")))
//!     .left_join::<Address>()
//!     .on(|s| s.at(1).col("Id").eq(s.last().col("CustomerId")))
//!     .results()?;
//!
//! for row in &rows {
//!     let customer: &Customer = row.get(1).unwrap();
//! }
//! ```
//!
//! Each selected column is aliased `Entity__Column`; entities are rebuilt from
//! the columns carrying their own prefix.

use crate::client::{ConnectionFactory, DataAccess};
use crate::column::ColumnDef;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, Param, XRef, translate_predicate};
use crate::ident::{qualified_column, qualified_table};
use crate::literal::quote_text;
use crate::row::{Entity, Row};
use std::any::{Any, TypeId};
use std::fmt;

/// Separator between entity name and column name in join aliases.
pub const ALIAS_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT OUTER JOIN",
            JoinKind::Right => "RIGHT OUTER JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

type HydrateFn = fn(&Row, &str) -> OrmResult<Box<dyn Any>>;

fn hydrate_boxed<E: Entity>(row: &Row, prefix: &str) -> OrmResult<Box<dyn Any>> {
    Ok(Box::new(E::hydrate(row, prefix)?))
}

/// Type-erased entity description used by join chains.
#[derive(Clone, Copy)]
pub struct EntityMeta {
    pub name: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
    pub columns: fn() -> &'static [ColumnDef],
    type_id: TypeId,
    hydrate: HydrateFn,
}

impl EntityMeta {
    pub fn of<E: Entity>() -> Self {
        Self {
            name: E::ENTITY_NAME,
            schema: E::SCHEMA,
            table: E::TABLE,
            columns: E::columns,
            type_id: TypeId::of::<E>(),
            hydrate: hydrate_boxed::<E>,
        }
    }

    pub fn is<E: Entity>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    fn prefix(&self) -> String {
        format!("{}{ALIAS_SEPARATOR}", self.name)
    }
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// One appended join.
#[derive(Debug, Clone)]
pub struct JoinStep {
    pub meta: EntityMeta,
    pub kind: JoinKind,
    pub alias: String,
    /// Translated ON predicate.
    pub on: String,
    /// Param-to-alias map the predicate was translated with.
    pub xref: XRef,
}

fn alias(index: usize) -> String {
    format!("c{index}")
}

/// The entities visible to an ON predicate, by chain position.
pub struct JoinScope {
    members: Vec<EntityMeta>,
}

impl JoinScope {
    fn new(members: Vec<EntityMeta>) -> Self {
        Self { members }
    }

    /// Param for the entity at chain position `index`.
    ///
    /// An out-of-range position yields a param without columns, so every
    /// column reference fails translation.
    pub fn at(&self, index: usize) -> Param {
        match self.members.get(index) {
            Some(meta) => Param::new(index, meta.name, (meta.columns)()),
            None => Param::new(index, "<out of range>", &[]),
        }
    }

    /// Param for the most recent chain member of type `E`.
    pub fn of<E: Entity>(&self) -> Param {
        match self.members.iter().rposition(|m| m.is::<E>()) {
            Some(index) => self.at(index),
            None => Param::new(self.members.len(), E::ENTITY_NAME, &[]),
        }
    }

    /// Param for the entity being joined.
    pub fn last(&self) -> Param {
        self.at(self.members.len().saturating_sub(1))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `p{i}` → `c{i}` for every member.
    pub fn xref(&self) -> XRef {
        (0..self.members.len())
            .map(|i| (format!("p{i}"), alias(i)))
            .collect()
    }
}

/// A chain whose joins all carry ON predicates.
pub struct JoinChain<'a, F> {
    access: &'a DataAccess<F>,
    root: EntityMeta,
    steps: Vec<JoinStep>,
    error: Option<OrmError>,
}

/// A join awaiting its ON predicate.
#[must_use = "a join needs `.on(...)` before the chain can continue"]
pub struct PendingJoin<'a, F> {
    chain: JoinChain<'a, F>,
    meta: EntityMeta,
    kind: JoinKind,
}

impl<'a, F> PendingJoin<'a, F> {
    /// Attach the ON predicate, built over the chain plus the joined entity.
    pub fn on(self, predicate: impl FnOnce(&JoinScope) -> Expr) -> JoinChain<'a, F> {
        let mut chain = self.chain;
        let mut members = chain.members();
        members.push(self.meta);
        let scope = JoinScope::new(members);
        let xref = scope.xref();

        let on = if chain.error.is_some() {
            String::new()
        } else {
            match translate_predicate(&predicate(&scope), &xref) {
                Ok(sql) => sql,
                Err(err) => {
                    chain.error = Some(err);
                    String::new()
                }
            }
        };

        chain.steps.push(JoinStep {
            meta: self.meta,
            kind: self.kind,
            alias: alias(chain.steps.len() + 1),
            on,
            xref,
        });
        chain
    }
}

impl<'a, F> JoinChain<'a, F> {
    pub fn new(access: &'a DataAccess<F>, root: EntityMeta) -> Self {
        Self {
            access,
            root,
            steps: Vec::new(),
            error: None,
        }
    }

    /// Chain members in order, starting with the root.
    pub fn members(&self) -> Vec<EntityMeta> {
        std::iter::once(self.root)
            .chain(self.steps.iter().map(|s| s.meta))
            .collect()
    }

    pub fn steps(&self) -> &[JoinStep] {
        &self.steps
    }

    /// Append a join of `meta`.
    pub fn add_join(self, meta: EntityMeta, kind: JoinKind) -> PendingJoin<'a, F> {
        PendingJoin {
            chain: self,
            meta,
            kind,
        }
    }

    pub fn inner_join<E: Entity>(self) -> PendingJoin<'a, F> {
        self.add_join(EntityMeta::of::<E>(), JoinKind::Inner)
    }

    pub fn left_join<E: Entity>(self) -> PendingJoin<'a, F> {
        self.add_join(EntityMeta::of::<E>(), JoinKind::Left)
    }

    pub fn right_join<E: Entity>(self) -> PendingJoin<'a, F> {
        self.add_join(EntityMeta::of::<E>(), JoinKind::Right)
    }

    pub fn full_join<E: Entity>(self) -> PendingJoin<'a, F> {
        self.add_join(EntityMeta::of::<E>(), JoinKind::Full)
    }

    /// Render the SELECT statement for the chain.
    pub fn to_sql(&self) -> OrmResult<String> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let select_list: Vec<String> = self
            .members()
            .iter()
            .enumerate()
            .flat_map(|(i, meta)| {
                let table_alias = alias(i);
                (meta.columns)().iter().map(move |col| {
                    format!(
                        "{} AS {}",
                        qualified_column(Some(table_alias.as_str()), col.name),
                        quote_text(&format!("{}{ALIAS_SEPARATOR}{}", meta.name, col.name))
                    )
                })
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {} {}",
            select_list.join(", "),
            qualified_table(self.root.schema, self.root.table),
            alias(0)
        );
        for step in &self.steps {
            sql.push_str(&format!(
                " {} {} {} ON {}",
                step.kind.keyword(),
                qualified_table(step.meta.schema, step.meta.table),
                step.alias,
                step.on
            ));
        }
        Ok(sql)
    }
}

impl<F: ConnectionFactory> JoinChain<'_, F> {
    /// Execute the chain; one [`JoinedRow`] per result row.
    ///
    /// A backend failure is reported to the sink and yields no rows.
    pub fn results(&self) -> OrmResult<Vec<JoinedRow>> {
        let sql = self.to_sql()?;
        let Some(rows) = self.access.query(&sql, &[])? else {
            return Ok(Vec::new());
        };

        let members = self.members();
        let prefixes: Vec<String> = members.iter().map(EntityMeta::prefix).collect();
        rows.iter()
            .map(|row| {
                let entities = members
                    .iter()
                    .zip(&prefixes)
                    .map(|(meta, prefix)| (meta.hydrate)(row, prefix))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(JoinedRow { entities })
            })
            .collect()
    }
}

/// One result row of a join: an entity per chain member, in chain order.
pub struct JoinedRow {
    entities: Vec<Box<dyn Any>>,
}

impl JoinedRow {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at chain position `index`, if it has type `E`.
    pub fn get<E: Entity>(&self, index: usize) -> Option<&E> {
        self.entities.get(index)?.downcast_ref()
    }

    /// First entity of type `E`.
    pub fn first<E: Entity>(&self) -> Option<&E> {
        self.entities.iter().find_map(|e| e.downcast_ref())
    }

    /// Move the entity at `index` out of the row.
    ///
    /// The slot is left empty; a second `take` of the same index returns `None`.
    pub fn take<E: Entity>(&mut self, index: usize) -> Option<E> {
        let slot = self.entities.get_mut(index)?;
        if !slot.is::<E>() {
            return None;
        }
        let boxed = std::mem::replace(slot, Box::new(()));
        boxed.downcast::<E>().ok().map(|b| *b)
    }

    pub fn into_entities(self) -> Vec<Box<dyn Any>> {
        self.entities
    }
}

impl fmt::Debug for JoinedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinedRow")
            .field("len", &self.entities.len())
            .finish()
    }
}
