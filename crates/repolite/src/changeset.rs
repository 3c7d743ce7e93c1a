//! Entity validation errors.
//!
//! Repositories call [`Entity::validate`](crate::Entity::validate) before every
//! insert or update and refuse to write an entity that reports any error.

use crate::value::Value;
use std::fmt;

/// What kind of rule a field failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    Required,
    MaxLen,
    Custom(String),
}

impl ValidationCode {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationCode::Required => "required",
            ValidationCode::MaxLen => "max_len",
            ValidationCode::Custom(s) => s.as_str(),
        }
    }
}

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Column the rule is attached to.
    pub field: &'static str,
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All validation errors reported by one entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    pub items: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.items.push(err);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.items.iter()
    }

    /// Errors attached to `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.items.iter().filter(move |e| e.field == field)
    }

    /// Record an error when `value` is NULL.
    ///
    /// Empty text passes; only a missing value fails.
    pub fn check_required(&mut self, field: &'static str, value: &Value) {
        if value.is_null() {
            self.push(ValidationError::new(
                field,
                ValidationCode::Required,
                "Value cannot be null",
            ));
        }
    }

    /// Record an error when a text value is longer than `max` characters.
    ///
    /// NULL and non-text values pass.
    pub fn check_max_len(&mut self, field: &'static str, value: &Value, max: usize) {
        let len = match value {
            Value::String(s) | Value::Xml(s) => s.chars().count(),
            Value::Char(_) => 1,
            _ => return,
        };
        if len > max {
            self.push(ValidationError::new(
                field,
                ValidationCode::MaxLen,
                format!("Max length is {max}"),
            ));
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_only_null() {
        let mut errors = ValidationErrors::default();
        errors.check_required("Name", &Value::Null);
        errors.check_required("Code", &Value::from(""));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.items[0].code, ValidationCode::Required);
        assert_eq!(errors.to_string(), "Name: Value cannot be null");
    }

    #[test]
    fn max_len_counts_characters() {
        let mut errors = ValidationErrors::default();
        errors.check_max_len("City", &Value::from("Zürich"), 6);
        errors.check_max_len("City", &Value::Null, 1);
        errors.check_max_len("Age", &Value::Int(123456), 2);
        assert!(errors.is_empty());

        errors.check_max_len("City", &Value::from("Amsterdam"), 6);
        let city: Vec<_> = errors.for_field("City").collect();
        assert_eq!(city.len(), 1);
        assert_eq!(city[0].message, "Max length is 6");
        assert_eq!(city[0].code.as_str(), "max_len");
    }
}
