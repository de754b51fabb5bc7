//! Error types for schema validation and definition loading.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::{format_path, PathSegment, Value};

/// The closed set of validation failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum IssueKind {
    /// Value has the wrong shape. Also used for missing required values.
    InvalidType { expected: String, received: String },

    /// Value is not the exact value (or one of the values) expected.
    InvalidExactValue { expected: Value, received: Value },

    /// Value, length or count is below its lower bound.
    TooSmall {
        minimum: Value,
        received: Value,
        inclusive: bool,
    },

    /// Value, length or count is above its upper bound.
    TooBig {
        maximum: Value,
        received: Value,
        inclusive: bool,
    },

    /// Object has keys outside its declared shape.
    UnrecognizedKeys { keys: Vec<String> },

    /// Value is not a member of an enumeration.
    UnrecognizedValue { options: Vec<Value>, received: Value },

    /// No union branch accepted the value.
    InvalidUnion { errors: Vec<SchematicError> },

    /// An intersection branch rejected the value.
    InvalidIntersection { errors: Vec<SchematicError> },
}

impl IssueKind {
    /// Stable identifier for this kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::InvalidType { .. } => "invalid_type",
            IssueKind::InvalidExactValue { .. } => "invalid_exact_value",
            IssueKind::TooSmall { .. } => "too_small",
            IssueKind::TooBig { .. } => "too_big",
            IssueKind::UnrecognizedKeys { .. } => "unrecognized_keys",
            IssueKind::UnrecognizedValue { .. } => "unrecognized_value",
            IssueKind::InvalidUnion { .. } => "invalid_union",
            IssueKind::InvalidIntersection { .. } => "invalid_intersection",
        }
    }

    /// Branch errors carried by union and intersection failures.
    pub fn nested(&self) -> &[SchematicError] {
        match self {
            IssueKind::InvalidUnion { errors } | IssueKind::InvalidIntersection { errors } => {
                errors
            }
            _ => &[],
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchematicError {
    #[serde(flatten)]
    pub kind: IssueKind,
    /// Keys and indices from the root value to the failing value.
    pub path: Vec<PathSegment>,
    /// Human-readable error message.
    pub message: String,
}

impl SchematicError {
    pub fn new(kind: IssueKind, path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for SchematicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", format_path(&self.path), self.message)
        }
    }
}

/// Aggregate failure returned by `parse`, carrying every collected error in order.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    pub errors: Vec<SchematicError>,
}

impl ParseError {
    pub fn new(errors: Vec<SchematicError>) -> Self {
        let message = match errors.as_slice() {
            [single] => single.message.clone(),
            many => format!("{} errors occurred", many.len()),
        };
        Self { message, errors }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of `parse_into`: either validation or projection into the target type.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Invalid(#[from] ParseError),

    #[error("validated value does not fit the target type: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },
}

/// Errors while loading or compiling a declarative schema definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Definition errors (exit code 2)
    #[error("invalid definition at {path}: {message}")]
    InvalidDefinition { path: String, message: String },

    #[error("invalid pattern at {path}: {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },
}

impl DefinitionError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DefinitionError::FileNotFound { .. } | DefinitionError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            DefinitionError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors from validating a payload against a definition.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchematicError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Definition(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

impl From<ParseError> for ValidateError {
    fn from(err: ParseError) -> Self {
        ValidateError::Invalid { errors: err.errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn type_error(path: Vec<PathSegment>, message: &str) -> SchematicError {
        SchematicError::new(
            IssueKind::InvalidType {
                expected: "string".into(),
                received: "number".into(),
            },
            path,
            message,
        )
    }

    #[test]
    fn definition_error_exit_codes() {
        let err = DefinitionError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = DefinitionError::InvalidDefinition {
            path: "/shape/id".into(),
            message: "unknown type".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![type_error(vec![], "Expected string but received number")],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::from(DefinitionError::FileNotFound {
            path: PathBuf::from("missing.json"),
        });
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn schematic_error_display() {
        let err = type_error(
            vec![PathSegment::from("buyer"), PathSegment::from("email")],
            "Expected string but received number",
        );
        assert_eq!(
            err.to_string(),
            "buyer.email: Expected string but received number"
        );

        let err = type_error(vec![], "Required");
        assert_eq!(err.to_string(), "(root): Required");
    }

    #[test]
    fn parse_error_message_uses_single_error() {
        let err = ParseError::new(vec![type_error(vec![], "Required")]);
        assert_eq!(err.to_string(), "Required");
    }

    #[test]
    fn parse_error_message_counts_errors() {
        let err = ParseError::new(vec![
            type_error(vec![PathSegment::Index(1)], "a"),
            type_error(vec![PathSegment::Index(3)], "b"),
        ]);
        assert_eq!(err.to_string(), "2 errors occurred");
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn errors_serialize_with_code_and_path() {
        let err = type_error(
            vec![PathSegment::from("items"), PathSegment::Index(2)],
            "Expected string but received number",
        );
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "code": "invalid_type",
                "expected": "string",
                "received": "number",
                "path": ["items", 2],
                "message": "Expected string but received number"
            })
        );
    }
}
