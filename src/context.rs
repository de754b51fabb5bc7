//! Validation context and result status.
//!
//! A `ValidationContext` is created for the root value of every parse and for
//! each descent into a nested value. It carries:
//! - the path from the root, for error reporting
//! - the errors recorded at or below this position
//!
//! Children never share a context with their parent. Composite schemas build a
//! child, run the nested schema on it and merge its errors back in order.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{IssueKind, ParseError, SchematicError};
use crate::types::{format_path, PathSegment, Value};

/// Outcome of a single validation step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// Accepted without issue.
    Valid(Value),
    /// Structurally accepted, but an issue was recorded beneath this value.
    Dirty(Value),
    /// Rejected. Never carries a value.
    Invalid,
}

impl ParseResult {
    pub fn status(&self) -> ParseStatus {
        match self {
            ParseResult::Valid(_) => ParseStatus::Valid,
            ParseResult::Dirty(_) => ParseStatus::Dirty,
            ParseResult::Invalid => ParseStatus::Invalid,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ParseResult::Invalid)
    }

    /// Borrow the carried value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            ParseResult::Valid(v) | ParseResult::Dirty(v) => Some(v),
            ParseResult::Invalid => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            ParseResult::Valid(v) | ParseResult::Dirty(v) => Some(v),
            ParseResult::Invalid => None,
        }
    }
}

/// Rollup status for composite schemas. Ordered so that `max` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ParseStatus {
    #[default]
    Valid,
    Dirty,
    Invalid,
}

impl ParseStatus {
    /// Fold another outcome into this rollup.
    pub fn absorb(&mut self, other: ParseStatus) {
        *self = (*self).max(other);
    }

    /// Attach a value according to the rolled-up status.
    pub fn into_result(self, value: Value) -> ParseResult {
        match self {
            ParseStatus::Valid => ParseResult::Valid(value),
            ParseStatus::Dirty => ParseResult::Dirty(value),
            ParseStatus::Invalid => ParseResult::Invalid,
        }
    }
}

/// Per-position validation state.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<PathSegment>,
    errors: Vec<SchematicError>,
}

impl ValidationContext {
    /// Context for the root value of a parse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path from the root value to the value under validation.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Context for a nested value: path extended by `segment`, no errors.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut path = self.path.clone();
        path.push(segment.into());
        Self {
            path,
            errors: Vec::new(),
        }
    }

    /// Context for trial validation at the same path, no errors.
    pub fn fork(&self) -> Self {
        Self {
            path: self.path.clone(),
            errors: Vec::new(),
        }
    }

    /// Take over the errors recorded in a child or forked context.
    pub fn merge(&mut self, other: ValidationContext) {
        self.errors.extend(other.errors);
    }

    /// Record an error at the current path.
    pub fn add_error(&mut self, kind: IssueKind, message: impl Into<String>) {
        let error = SchematicError::new(kind, self.path.clone(), message);
        self.errors.push(error);
    }

    /// Record a fully-formed error as-is.
    pub fn push_error(&mut self, error: SchematicError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[SchematicError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SchematicError> {
        self.errors
    }

    /// Record the standard type mismatch for `received`.
    ///
    /// Missing values get a "required" message unless a custom one is set.
    pub(crate) fn invalid_type(&mut self, expected: &str, received: &Value, custom: Option<&str>) {
        let message = match custom {
            Some(message) => message.to_string(),
            None if received.is_undefined() => {
                if self.path.is_empty() {
                    "Required".to_string()
                } else {
                    format!("{} is required", format_path(&self.path))
                }
            }
            None => format!(
                "Expected {} but received {}",
                expected,
                received.type_name()
            ),
        };
        self.add_error(
            IssueKind::InvalidType {
                expected: expected.to_string(),
                received: received.type_name().to_string(),
            },
            message,
        );
    }
}

/// Outcome of `safe_parse`: the output value, or every error collected.
///
/// Serializes as `{"isValid": true, "value": ...}` or
/// `{"isValid": false, "errors": [...]}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SafeParse {
    Valid(Value),
    Invalid(Vec<SchematicError>),
}

impl SafeParse {
    pub fn is_valid(&self) -> bool {
        matches!(self, SafeParse::Valid(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            SafeParse::Valid(value) => Some(value),
            SafeParse::Invalid(_) => None,
        }
    }

    /// Collected errors; empty when valid.
    pub fn errors(&self) -> &[SchematicError] {
        match self {
            SafeParse::Valid(_) => &[],
            SafeParse::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<Value, ParseError> {
        match self {
            SafeParse::Valid(value) => Ok(value),
            SafeParse::Invalid(errors) => Err(ParseError::new(errors)),
        }
    }
}

impl Serialize for SafeParse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("SafeParse", 2)?;
        out.serialize_field("isValid", &self.is_valid())?;
        match self {
            SafeParse::Valid(value) => out.serialize_field("value", value)?,
            SafeParse::Invalid(errors) => out.serialize_field("errors", errors)?,
        }
        out.end()
    }
}
