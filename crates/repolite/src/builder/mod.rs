//! Fluent WHERE-clause construction.
//!
//! [`WhereClause`] accumulates conditions joined by AND/OR with nested groups,
//! rendering T-SQL literals inline. Invalid calls are recorded and surfaced by
//! [`WhereClause::to_clause`], so chains never panic midway.

pub mod where_clause;

pub use where_clause::{ClauseType, Condition, Link, Node, WhereClause};

/// Comparison applied by a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equals,
    NotEquals,
    Like,
    NotLike,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Comparison {
    /// Ordering comparisons; their operand must be numeric.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Comparison::GreaterThan
                | Comparison::GreaterThanOrEquals
                | Comparison::LessThan
                | Comparison::LessThanOrEquals
        )
    }

    /// Comparisons that take no value.
    pub fn is_null_check(self) -> bool {
        matches!(self, Comparison::IsNull | Comparison::IsNotNull)
    }

    /// Operator text for binary comparisons.
    pub(crate) fn operator(self) -> &'static str {
        match self {
            Comparison::Equals => "=",
            Comparison::NotEquals => "<>",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEquals => ">=",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEquals => "<=",
            Comparison::Like => "LIKE",
            Comparison::NotLike => "NOT LIKE",
            Comparison::In => "IN",
            Comparison::NotIn => "NOT IN",
            Comparison::IsNull => "IS NULL",
            Comparison::IsNotNull => "IS NOT NULL",
        }
    }
}

/// The comparisons that compare against a single scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindComparison {
    Equals,
    NotEquals,
    Like,
    NotLike,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
}

impl From<FindComparison> for Comparison {
    fn from(c: FindComparison) -> Self {
        match c {
            FindComparison::Equals => Comparison::Equals,
            FindComparison::NotEquals => Comparison::NotEquals,
            FindComparison::Like => Comparison::Like,
            FindComparison::NotLike => Comparison::NotLike,
            FindComparison::GreaterThan => Comparison::GreaterThan,
            FindComparison::GreaterThanOrEquals => Comparison::GreaterThanOrEquals,
            FindComparison::LessThan => Comparison::LessThan,
            FindComparison::LessThanOrEquals => Comparison::LessThanOrEquals,
        }
    }
}
