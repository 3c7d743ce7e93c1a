//! WHERE clause accumulator shared by repositories and ad-hoc queries.

use super::Comparison;
use crate::column::{ColumnDef, find_column};
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_ident;
use crate::literal::{format_list, format_literal, strip_quotes};
use crate::value::Value;

/// How a link attaches to what precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseType {
    Initial,
    And,
    Or,
}

impl ClauseType {
    fn separator(self) -> &'static str {
        match self {
            ClauseType::Initial => "",
            ClauseType::And => " AND ",
            ClauseType::Or => " OR ",
        }
    }
}

/// One validated, pre-rendered comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
    pub value: Option<Value>,
    /// Column compared through `CONVERT(NVARCHAR(MAX), ...)`.
    pub text_cast: bool,
    sql: String,
}

impl Condition {
    /// Validate and render a condition.
    pub fn new(
        column: &str,
        comparison: Comparison,
        value: Option<Value>,
        text_cast: bool,
    ) -> OrmResult<Self> {
        let value = if comparison.is_null_check() {
            None
        } else {
            Some(value.ok_or_else(|| {
                OrmError::invalid_comparison(format!(
                    "{comparison:?} on [{column}] requires a value; only IsNull/IsNotNull may omit it"
                ))
            })?)
        };

        if let Some(v) = &value
            && comparison.is_ordering()
            && !v.is_numeric()
        {
            return Err(OrmError::invalid_comparison(format!(
                "{comparison:?} on [{column}] requires a numeric value, got {}",
                v.kind_name()
            )));
        }

        let sql = render(column, comparison, value.as_ref(), text_cast)?;
        Ok(Self {
            column: column.to_string(),
            comparison,
            value,
            text_cast,
            sql,
        })
    }

    pub fn to_sql(&self) -> &str {
        &self.sql
    }
}

fn render(column: &str, comparison: Comparison, value: Option<&Value>, text_cast: bool) -> OrmResult<String> {
    let col = if text_cast {
        format!("CONVERT(NVARCHAR(MAX), {})", quote_ident(column))
    } else {
        quote_ident(column)
    };

    let Some(value) = value else {
        return Ok(format!("{col} {}", comparison.operator()));
    };

    match comparison {
        Comparison::Like | Comparison::NotLike => {
            let literal = format_literal(value)?;
            Ok(format!("{col} {} '%{}%'", comparison.operator(), strip_quotes(&literal)))
        }
        Comparison::In | Comparison::NotIn => {
            let batches = match value {
                Value::List(items) => format_list(items)?,
                scalar => format_list(std::slice::from_ref(scalar))?,
            };
            let (empty, joiner) = if comparison == Comparison::In {
                ("1=0", " OR ")
            } else {
                ("1=1", " AND ")
            };
            let op = comparison.operator();
            Ok(match batches.as_slice() {
                [] => empty.to_string(),
                [single] => format!("{col} {op} ({single})"),
                many => {
                    let parts: Vec<String> =
                        many.iter().map(|b| format!("{col} {op} ({b})")).collect();
                    format!("({})", parts.join(joiner))
                }
            })
        }
        _ => Ok(format!(
            "{col} {} {}",
            comparison.operator(),
            format_literal(value)?
        )),
    }
}

/// A clause node: a condition or a parenthesized group.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    Group(Vec<Link>),
}

/// A node with the connective that attaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub clause_type: ClauseType,
    pub node: Node,
}

fn render_links(links: &[Link], out: &mut String) {
    for (i, link) in links.iter().enumerate() {
        if i > 0 {
            out.push_str(link.clause_type.separator());
        }
        match &link.node {
            Node::Condition(c) => out.push_str(c.to_sql()),
            Node::Group(inner) => {
                out.push('(');
                render_links(inner, out);
                out.push(')');
            }
        }
    }
}

/// Fluent WHERE clause builder.
///
/// ```ignore
/// let mut w = WhereClause::new();
/// w.start("Age", Comparison::GreaterThan, 18)
///     .and_begin_group_null("Email", Comparison::IsNull)
///     .or("Verified", Comparison::Equals, false)
///     .end_group();
/// assert_eq!(
///     w.to_clause()?,
///     "[Age] > 18 AND ([Email] IS NULL OR [Verified] = 0)"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    links: Vec<Link>,
    open: Vec<(ClauseType, Vec<Link>)>,
    columns: &'static [ColumnDef],
    error: Option<OrmError>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that consults `columns` for declared types (text-cast columns).
    pub fn for_columns(columns: &'static [ColumnDef]) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Number of groups currently open.
    pub fn open_groups(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.open.is_empty()
    }

    /// First error recorded by a builder call, if any.
    pub fn error(&self) -> Option<&OrmError> {
        self.error.as_ref()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    fn current(&mut self) -> &mut Vec<Link> {
        match self.open.last_mut() {
            Some((_, links)) => links,
            None => &mut self.links,
        }
    }

    fn condition(&self, column: &str, comparison: Comparison, value: Option<Value>) -> OrmResult<Condition> {
        let declared_cast = find_column(self.columns, column).is_some_and(ColumnDef::needs_text_cast);
        let value_cast = matches!(value, Some(Value::Xml(_)));
        Condition::new(column, comparison, value, declared_cast || value_cast)
    }

    fn push(&mut self, clause_type: ClauseType, column: &str, comparison: Comparison, value: Option<Value>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match self.condition(column, comparison, value) {
            Ok(condition) => self.current().push(Link {
                clause_type,
                node: Node::Condition(condition),
            }),
            Err(err) => self.error = Some(err),
        }
        self
    }

    fn begin_group(&mut self, clause_type: ClauseType, column: &str, comparison: Comparison, value: Option<Value>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match self.condition(column, comparison, value) {
            Ok(condition) => self.open.push((
                clause_type,
                vec![Link {
                    clause_type: ClauseType::Initial,
                    node: Node::Condition(condition),
                }],
            )),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// First condition of the clause.
    pub fn start(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> &mut Self {
        self.push(ClauseType::Initial, column, comparison, Some(value.into()))
    }

    /// First condition, without a value (IsNull/IsNotNull).
    pub fn start_null(&mut self, column: &str, comparison: Comparison) -> &mut Self {
        self.push(ClauseType::Initial, column, comparison, None)
    }

    pub fn and(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> &mut Self {
        self.push(ClauseType::And, column, comparison, Some(value.into()))
    }

    pub fn or(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> &mut Self {
        self.push(ClauseType::Or, column, comparison, Some(value.into()))
    }

    pub fn and_null(&mut self, column: &str, comparison: Comparison) -> &mut Self {
        self.push(ClauseType::And, column, comparison, None)
    }

    pub fn or_null(&mut self, column: &str, comparison: Comparison) -> &mut Self {
        self.push(ClauseType::Or, column, comparison, None)
    }

    /// Open a group joined with AND, starting with this condition.
    pub fn and_begin_group(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> &mut Self {
        self.begin_group(ClauseType::And, column, comparison, Some(value.into()))
    }

    /// Open a group joined with OR, starting with this condition.
    pub fn or_begin_group(&mut self, column: &str, comparison: Comparison, value: impl Into<Value>) -> &mut Self {
        self.begin_group(ClauseType::Or, column, comparison, Some(value.into()))
    }

    pub fn and_begin_group_null(&mut self, column: &str, comparison: Comparison) -> &mut Self {
        self.begin_group(ClauseType::And, column, comparison, None)
    }

    pub fn or_begin_group_null(&mut self, column: &str, comparison: Comparison) -> &mut Self {
        self.begin_group(ClauseType::Or, column, comparison, None)
    }

    /// Close the innermost open group.
    pub fn end_group(&mut self) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match self.open.pop() {
            Some((clause_type, links)) => self.current().push(Link {
                clause_type,
                node: Node::Group(links),
            }),
            None => self.error = Some(OrmError::UnbalancedGroup),
        }
        self
    }

    /// Render the clause text (without `WHERE`).
    ///
    /// Fails with the first recorded error, or with [`OrmError::UnclosedGroup`]
    /// while groups remain open.
    pub fn to_clause(&self) -> OrmResult<String> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if !self.open.is_empty() {
            return Err(OrmError::UnclosedGroup(self.open.len()));
        }
        let mut out = String::new();
        render_links(&self.links, &mut out);
        Ok(out)
    }
}
