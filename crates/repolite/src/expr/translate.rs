use super::{BinaryOp, Expr, UnaryOp, methods};
use crate::error::{OrmError, OrmResult};
use crate::ident::qualified_column;
use crate::literal::{format_list, format_literal, quote_text, strip_quotes};
use crate::value::{Value, ValueType};
use std::collections::HashMap;

/// Parameter name → table alias (`p1` → `c1`).
pub type XRef = HashMap<String, String>;

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    /// Bare booleans render as themselves instead of `= 1` equality.
    bool_comparison: bool,
    prefix: &'static str,
    postfix: &'static str,
}

impl Mode {
    const UNARY: Mode = Mode {
        bool_comparison: false,
        prefix: "",
        postfix: "",
    };

    fn operand(expr: &Expr) -> Mode {
        Mode {
            bool_comparison: expr.is_boolean(),
            ..Mode::default()
        }
    }

    fn pattern(prefix: &'static str, postfix: &'static str) -> Mode {
        Mode {
            prefix,
            postfix,
            ..Mode::default()
        }
    }

    fn has_pattern(&self) -> bool {
        !self.prefix.is_empty() || !self.postfix.is_empty()
    }
}

/// Translate an expression to SQL text.
///
/// Columns whose param has an alias in `xref` render as `[alias].[Name]`,
/// others as `[Name]`.
pub fn translate(expr: &Expr, xref: &XRef) -> OrmResult<String> {
    Translator { xref }.visit(expr, Mode::UNARY)
}

/// Translate a boolean predicate; non-boolean roots are rejected.
pub fn translate_predicate(expr: &Expr, xref: &XRef) -> OrmResult<String> {
    if !expr.is_boolean() {
        return Err(OrmError::unsupported_expression(format!(
            "predicate root must be boolean, got {}",
            describe(expr)
        )));
    }
    translate(expr, xref)
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Column { name, .. } => format!("column `{name}`"),
        Expr::UnknownColumn { entity, name } => format!("column `{entity}.{name}`"),
        Expr::Constant(v) => format!("{} constant", v.kind_name()),
        Expr::Unary { op, .. } => format!("unary operator `{op:?}`"),
        Expr::Binary { op, .. } => format!("binary operator `{op:?}`"),
        Expr::OptionalValue(_) => "optional value".to_string(),
        Expr::HasValue(_) => "has-value check".to_string(),
        Expr::Call { name, .. } => format!("method call `{name}`"),
    }
}

struct Translator<'a> {
    xref: &'a XRef,
}

impl Translator<'_> {
    fn visit(&self, expr: &Expr, mode: Mode) -> OrmResult<String> {
        match expr {
            Expr::Column {
                param,
                name,
                value_type,
            } => Ok(self.column(param.as_deref(), name, *value_type, mode)),
            Expr::UnknownColumn { entity, name } => Err(OrmError::unsupported_expression(format!(
                "entity `{entity}` has no column `{name}`"
            ))),
            Expr::Constant(value) => constant(value, mode),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Convert => self.visit(operand, mode),
                UnaryOp::Not => Ok(format!("(NOT {})", self.visit(operand, Mode::UNARY)?)),
                UnaryOp::Negate => Ok(format!("(-{})", self.visit(operand, Mode::UNARY)?)),
            },
            Expr::Binary { left, op, right } => self.binary(left, *op, right),
            Expr::OptionalValue(inner) => self.visit(inner, mode),
            Expr::HasValue(inner) => {
                let col = self.visit(inner, Mode::operand(inner))?;
                Ok(format!("({col} <> '')"))
            }
            Expr::Call {
                name,
                receiver,
                args,
            } => self.call(name, receiver.as_deref(), args),
        }
    }

    fn column(&self, param: Option<&str>, name: &str, value_type: Option<ValueType>, mode: Mode) -> String {
        let alias = param.and_then(|p| self.xref.get(p)).map(String::as_str);
        let col = qualified_column(alias, name);

        if mode.has_pattern() {
            let mut out = String::new();
            if !mode.prefix.is_empty() {
                out.push_str(&quote_text(mode.prefix));
                out.push('+');
            }
            out.push_str(&col);
            if !mode.postfix.is_empty() {
                out.push('+');
                out.push_str(&quote_text(mode.postfix));
            }
            return out;
        }

        if value_type == Some(ValueType::Bool) && !mode.bool_comparison {
            format!("({col} = 1)")
        } else {
            col
        }
    }

    fn binary(&self, left: &Expr, op: BinaryOp, right: &Expr) -> OrmResult<String> {
        let sql_op = op.sql().ok_or_else(|| {
            OrmError::unsupported_expression(format!("binary operator `{op:?}`"))
        })?;
        let l = self.visit(left, Mode::operand(left))?;
        let r = self.visit(right, Mode::operand(right))?;
        Ok(format!("({l} {sql_op} {r})"))
    }

    fn call(&self, name: &str, receiver: Option<&Expr>, args: &[Expr]) -> OrmResult<String> {
        match (name, receiver, args) {
            (methods::CONTAINS, Some(Expr::Constant(Value::List(items))), [item]) => {
                self.membership(items, item)
            }
            (methods::CONTAINS, None, [collection, item]) => match collection {
                Expr::Constant(Value::List(items)) => self.membership(items, item),
                other => Err(OrmError::unsupported_expression(format!(
                    "membership collection must be a materialized list, got {}",
                    describe(other)
                ))),
            },
            (methods::CONTAINS, Some(target), [arg]) => self.like(target, arg, "%", "%"),
            (methods::STARTS_WITH, Some(target), [arg]) => self.like(target, arg, "", "%"),
            (methods::ENDS_WITH, Some(target), [arg]) => self.like(target, arg, "%", ""),
            _ => Err(OrmError::unsupported_expression(format!("method call `{name}`"))),
        }
    }

    fn like(&self, target: &Expr, pattern: &Expr, prefix: &'static str, postfix: &'static str) -> OrmResult<String> {
        if matches!(target, Expr::Constant(Value::List(_))) || !matches!(pattern, Expr::Constant(_) | Expr::Column { .. } | Expr::OptionalValue(_)) {
            return Err(OrmError::unsupported_expression(format!(
                "pattern match of {} against {}",
                describe(target),
                describe(pattern)
            )));
        }
        let target = self.visit(target, Mode::operand(target))?;
        let pattern = self.visit(pattern, Mode::pattern(prefix, postfix))?;
        Ok(format!("({target} LIKE {pattern})"))
    }

    fn membership(&self, items: &[Value], item: &Expr) -> OrmResult<String> {
        let col = self.visit(item, Mode::operand(item))?;
        let batches = format_list(items)?;
        Ok(match batches.as_slice() {
            [] => "(1=0)".to_string(),
            [single] => format!("({col} IN ({single}))"),
            many => {
                let parts: Vec<String> = many.iter().map(|b| format!("{col} IN ({b})")).collect();
                format!("({})", parts.join(" OR "))
            }
        })
    }
}

fn constant(value: &Value, mode: Mode) -> OrmResult<String> {
    match value {
        Value::Bool(b) => {
            let text = if *b { "'True'" } else { "'False'" };
            if mode.bool_comparison {
                Ok(text.to_string())
            } else {
                Ok(format!("({text} = 1)"))
            }
        }
        Value::List(_) => Err(OrmError::unsupported_expression(
            "list constant outside a membership call",
        )),
        Value::Null => Err(OrmError::unsupported_type("NULL constant in predicate")),
        other => {
            let literal = format_literal(other)?;
            if mode.has_pattern() {
                Ok(quote_text(&format!(
                    "{}{}{}",
                    mode.prefix,
                    unquote(&literal),
                    mode.postfix
                )))
            } else {
                Ok(literal)
            }
        }
    }
}

/// Undo [`quote_text`] on a quoted literal; bare literals pass through.
fn unquote(literal: &str) -> String {
    if literal.starts_with('\'') {
        strip_quotes(literal).replace("''", "'")
    } else {
        literal.to_string()
    }
}
