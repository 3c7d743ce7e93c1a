//! Typed predicate expressions and their translation to T-SQL.
//!
//! An [`Expr`] is built from [`Param`] column references with fluent methods and
//! operators:
//!
//! ```ignore
//! let p = Param::of::<User>(0);
//! let pred = p.col("Age").gt(18).and(p.col("Name").starts_with("A"));
//! ```
//!
//! [`translate`] compiles the tree into one parenthesized boolean expression.

mod translate;

pub use translate::{XRef, translate, translate_predicate};

use crate::column::{ColumnDef, find_column};
use crate::row::Entity;
use crate::value::{Value, ValueType, Xml};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    /// Type conversion; transparent in SQL.
    Convert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    ExclusiveOr,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Null-coalescing; has no translation.
    Coalesce,
}

impl BinaryOp {
    /// SQL operator text, `None` when the operator has no SQL form.
    pub fn sql(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::ExclusiveOr => "^",
            BinaryOp::AndAlso => "AND",
            BinaryOp::OrElse => "OR",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::Coalesce => return None,
        })
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
        )
    }
}

/// Method names the translator understands.
pub mod methods {
    pub const CONTAINS: &str = "contains";
    pub const STARTS_WITH: &str = "starts_with";
    pub const ENDS_WITH: &str = "ends_with";
}

/// A predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column of the entity bound to `param` (unqualified when `None`).
    Column {
        param: Option<String>,
        name: String,
        value_type: Option<ValueType>,
    },
    /// A column name the entity does not declare.
    UnknownColumn { entity: String, name: String },
    Constant(Value),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Read through an optional column to its value.
    OptionalValue(Box<Expr>),
    /// Whether an optional column holds a value.
    HasValue(Box<Expr>),
    /// Method call, static when `receiver` is `None`.
    Call {
        name: String,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
}

/// Conversion into an expression operand.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

macro_rules! constant_into_expr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::Constant(self.into())
                }
            }
        )*
    };
}

constant_into_expr!(
    Value, bool, u8, i16, u16, i32, u32, i64, u64, f64, Decimal, &str, String, char,
    NaiveDateTime, Uuid, Xml,
);

impl<T: Into<Value>> IntoExpr for Vec<T> {
    fn into_expr(self) -> Expr {
        Expr::Constant(self.into())
    }
}

impl Expr {
    /// Unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column {
            param: None,
            name: name.into(),
            value_type: None,
        }
    }

    /// Column reference with a known type.
    pub fn typed_column(name: impl Into<String>, value_type: ValueType) -> Self {
        Expr::Column {
            param: None,
            name: name.into(),
            value_type: Some(value_type),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// Static method call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            receiver: None,
            args,
        }
    }

    /// Method call on `self`.
    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            receiver: Some(Box::new(self)),
            args,
        }
    }

    pub fn binary(self, op: BinaryOp, rhs: impl IntoExpr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(rhs.into_expr()),
        }
    }

    pub fn unary(op: UnaryOp, operand: impl IntoExpr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand.into_expr()),
        }
    }

    pub fn eq(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Equal, rhs)
    }

    pub fn ne(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::NotEqual, rhs)
    }

    pub fn gt(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::GreaterThan, rhs)
    }

    pub fn ge(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::GreaterThanOrEqual, rhs)
    }

    pub fn lt(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::LessThan, rhs)
    }

    pub fn le(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::LessThanOrEqual, rhs)
    }

    pub fn and(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::AndAlso, rhs)
    }

    pub fn or(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::OrElse, rhs)
    }

    pub fn bit_and(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::BitAnd, rhs)
    }

    pub fn bit_or(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::BitOr, rhs)
    }

    pub fn xor(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::ExclusiveOr, rhs)
    }

    pub fn coalesce(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Coalesce, rhs)
    }

    pub fn convert(self) -> Self {
        Expr::unary(UnaryOp::Convert, self)
    }

    /// Substring match: `LIKE '%arg%'`.
    pub fn contains(self, arg: impl IntoExpr) -> Self {
        self.method(methods::CONTAINS, vec![arg.into_expr()])
    }

    /// Prefix match: `LIKE 'arg%'`.
    pub fn starts_with(self, arg: impl IntoExpr) -> Self {
        self.method(methods::STARTS_WITH, vec![arg.into_expr()])
    }

    /// Suffix match: `LIKE '%arg'`.
    pub fn ends_with(self, arg: impl IntoExpr) -> Self {
        self.method(methods::ENDS_WITH, vec![arg.into_expr()])
    }

    /// Membership in a materialized collection: `IN (...)`.
    pub fn is_in(self, values: impl Into<Value>) -> Self {
        Expr::Constant(values.into()).method(methods::CONTAINS, vec![self])
    }

    /// The value of an optional column.
    pub fn value(self) -> Self {
        Expr::OptionalValue(Box::new(self))
    }

    /// Whether an optional column holds a value.
    pub fn has_value(self) -> Self {
        Expr::HasValue(Box::new(self))
    }

    /// Whether the expression is statically boolean.
    pub fn is_boolean(&self) -> bool {
        match self {
            Expr::Column { value_type, .. } => *value_type == Some(ValueType::Bool),
            Expr::UnknownColumn { .. } => false,
            Expr::Constant(v) => matches!(v, Value::Bool(_)),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => true,
                UnaryOp::Negate => false,
                UnaryOp::Convert => operand.is_boolean(),
            },
            Expr::Binary { left, op, right } => {
                op.is_logical()
                    || op.is_comparison()
                    || (matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::ExclusiveOr)
                        && left.is_boolean()
                        && right.is_boolean())
            }
            Expr::OptionalValue(inner) => inner.is_boolean(),
            Expr::HasValue(_) => true,
            Expr::Call { .. } => true,
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::unary(UnaryOp::Not, self)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Negate, self)
    }
}

macro_rules! arithmetic_ops {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: IntoExpr> std::ops::$trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )*
    };
}

arithmetic_ops!(
    Add::add => Add,
    Sub::sub => Subtract,
    Mul::mul => Multiply,
    Div::div => Divide,
    Rem::rem => Modulo,
);

/// Handle to one entity position in a predicate (`p0`, `p1`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: String,
    entity: &'static str,
    columns: &'static [ColumnDef],
}

impl Param {
    pub fn new(index: usize, entity: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self {
            name: format!("p{index}"),
            entity,
            columns,
        }
    }

    pub fn of<E: Entity>(index: usize) -> Self {
        Self::new(index, E::ENTITY_NAME, E::columns())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Column reference typed from the entity's metadata.
    pub fn col(&self, name: &str) -> Expr {
        match find_column(self.columns, name) {
            Some(column) => Expr::Column {
                param: Some(self.name.clone()),
                name: column.name.to_string(),
                value_type: Some(column.value_type),
            },
            None => Expr::UnknownColumn {
                entity: self.entity.to_string(),
                name: name.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests;
