//! Error types for repolite

use crate::changeset::ValidationErrors;
use thiserror::Error;

/// Result type alias for repolite operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query construction and execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrmError {
    /// A value the literal formatter cannot classify
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// An expression node or method call the translator does not understand
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A comparison that does not fit its operand (e.g. ordering on non-numeric text)
    #[error("Invalid comparison: {0}")]
    InvalidComparison(String),

    /// `end_group` called with no open group
    #[error("Unbalanced group: end_group() called with no open group")]
    UnbalancedGroup,

    /// Groups still open when the clause was finalized
    #[error("Unclosed group: {0} query group(s) must be closed before calling results()")]
    UnclosedGroup(usize),

    /// The injection guard rejected the statement
    #[error("Sql injection suspected, statement aborted: {0}")]
    InjectionSuspected(String),

    /// The entity definition no longer matches the database
    #[error(
        "Repository definition for [{schema}].[{table}] does not match the database \
         (expected {expected} columns, found {actual}); regenerate the repository"
    )]
    SchemaMismatch {
        schema: String,
        table: String,
        expected: usize,
        actual: usize,
    },

    /// The execution adapter failed
    #[error("Backend execution error: {0}")]
    Backend(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity failed its own field rules and was not written
    #[error("Invalid {entity}: {errors}")]
    InvalidEntity {
        entity: &'static str,
        errors: ValidationErrors,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Field-level errors reported by an entity, if this is an `InvalidEntity` error
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::InvalidEntity { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Create an unsupported-type error
    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::UnsupportedType(message.into())
    }

    /// Create an unsupported-expression error
    pub fn unsupported_expression(message: impl Into<String>) -> Self {
        Self::UnsupportedExpression(message.into())
    }

    /// Create an invalid-comparison error
    pub fn invalid_comparison(message: impl Into<String>) -> Self {
        Self::InvalidComparison(message.into())
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Check if this error came from the execution adapter
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Check if this is a structural/validation error raised before execution.
    ///
    /// These always propagate to the caller and never reach the error sink.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType(_)
                | Self::UnsupportedExpression(_)
                | Self::InvalidComparison(_)
                | Self::UnbalancedGroup
                | Self::UnclosedGroup(_)
                | Self::InjectionSuspected(_)
                | Self::Validation(_)
                | Self::InvalidEntity { .. }
        )
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
