//! Schematic
//!
//! Composable runtime validation of untrusted values.
//!
//! Schemas are small immutable values composed into a tree describing the
//! expected shape of some input. Parsing a value against the tree yields
//! either the (possibly transformed) output or every error found, each with
//! the path from the root to the offending value.
//!
//! # Example
//!
//! ```
//! use schematic::{array, number, object, string, PathSegment, Schematic, UnknownKeys, Value};
//! use serde_json::json;
//!
//! let user = object([("name", string().min(1).into_schema())])
//!     .field("age", number().int().nonnegative().optional())
//!     .field("tags", array(string()).default(json!([])));
//!
//! let output = user.parse(json!({ "name": "Ada", "extra": true })).unwrap();
//! assert_eq!(output, Value::from(json!({ "name": "Ada", "tags": [] })));
//!
//! let err = user.parse(json!({ "name": "", "age": -1 })).unwrap_err();
//! assert_eq!(err.errors.len(), 2);
//! assert_eq!(err.errors[0].path, vec![PathSegment::from("name")]);
//! assert_eq!(user.unknown_keys(), UnknownKeys::Strip);
//! ```
//!
//! # Results
//!
//! | Outcome | `parse` | `safe_parse` |
//! |---------|---------|--------------|
//! | Accepted | `Ok(output)` | `SafeParse::Valid(output)` |
//! | Rejected | `Err(ParseError)` with every error | `SafeParse::Invalid(errors)` |
//!
//! Composite schemas never stop at the first failure: every array element,
//! object key and record entry is validated, and all errors are reported in
//! visiting order.
//!
//! # Typed output
//!
//! [`Schematic::parse_into`] validates and then deserializes the output with
//! serde, so the static type lives in an ordinary Rust type:
//!
//! | Schema | Rust type |
//! |--------|-----------|
//! | `string()` | `String` |
//! | `number()` | `f64` or any integer type |
//! | `boolean()` | `bool` |
//! | `date()` | `chrono::DateTime<Utc>` |
//! | `array(x)` | `Vec<X>` |
//! | `object(shape)` | a struct with one field per key |
//! | `record(x)` | `HashMap<String, X>` or `IndexMap<String, X>` |
//! | `enumeration(values)` | a unit-variant enum |
//! | `x.optional()` / `x.nullable()` | `Option<X>` |
//!
//! # Definitions
//!
//! Schemas can also be described declaratively in JSON (see [`Definition`]),
//! loaded from files or URLs, linted, and checked from the `schematic` CLI.

mod array;
mod context;
mod definition;
mod enumeration;
mod error;
mod intersection;
mod linter;
mod loader;
mod merge;
mod object;
mod primitive;
mod record;
mod schema;
mod types;
mod union;
mod validator;

pub use array::{array, ArraySchema};
pub use context::{ParseResult, ParseStatus, SafeParse, ValidationContext};
pub use definition::{
    ArrayDefinition, DateDefinition, Definition, DefinitionKind, EnumDefinition,
    IntersectionDefinition, NumberDefinition, ObjectDefinition, RecordDefinition,
    StringDefinition, UnionDefinition,
};
pub use enumeration::{enumeration, EnumSchema};
pub use error::{
    DefinitionError, IssueKind, ParseError, ProjectError, SchematicError, ValidateError,
};
pub use intersection::{intersection, IntersectionSchema};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    is_url, load_definition, load_definition_auto, load_definition_str, load_json, load_payload,
};
pub use object::{object, ObjectSchema, UnknownKeys};
pub use primitive::{
    boolean, date, number, string, BooleanSchema, DateBound, DateSchema, NumberSchema,
    StringSchema,
};
pub use record::{record, record_with_keys, RecordSchema};
pub use schema::{Check, Schema, SchemaBase, Schematic, Transformer};
pub use types::{format_path, Object, PathSegment, Value};
pub use union::{union, UnionSchema};
pub use validator::{validate, validate_with_definition};

#[cfg(feature = "remote")]
pub use loader::load_definition_url;
