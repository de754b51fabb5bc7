//! Declarative schema definitions.
//!
//! A definition is a JSON document describing a schema tree, so schemas can be
//! stored next to the data they validate and used from the command line.
//!
//! ```json
//! {
//!   "type": "object",
//!   "unknownKeys": "reject",
//!   "shape": {
//!     "email": { "type": "string", "email": true },
//!     "age": { "type": "number", "int": true, "min": 0, "optional": true },
//!     "tags": { "type": "array", "items": { "type": "string" }, "default": [] }
//!   }
//! }
//! ```
//!
//! Every node carries a `"type"` tag plus kind-specific refinements. The
//! modifiers `optional`, `nullable`, `coerce`, `default`, `allow` and
//! `message` are accepted on any node. JSON has no date literal, so `date`
//! nodes only accept payload values with `"coerce": true`; their bounds and
//! defaults may be RFC 3339 strings or epoch milliseconds.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::array::ArraySchema;
use crate::enumeration::enumeration;
use crate::error::DefinitionError;
use crate::object::{ObjectSchema, UnknownKeys};
use crate::primitive::{boolean, date, number, parse_date_str, string};
use crate::record::{record, record_with_keys};
use crate::schema::{Schema, Schematic};
use crate::types::{date_from_millis, Value};
use crate::union::union;

/// One node of a declarative schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(flatten)]
    pub kind: DefinitionKind,

    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub coerce: bool,

    /// Present even when the JSON value is `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<serde_json::Value>>,

    /// Replaces the type mismatch message of this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Kind-specific part of a definition, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DefinitionKind {
    String(StringDefinition),
    Number(NumberDefinition),
    Boolean,
    Date(DateDefinition),
    Enum(EnumDefinition),
    Array(ArrayDefinition),
    Object(ObjectDefinition),
    Record(RecordDefinition),
    Union(UnionDefinition),
    Intersection(IntersectionDefinition),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StringDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<usize>,
    #[serde(skip_serializing_if = "is_false")]
    pub nonempty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub email: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub trim: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub lowercase: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub uppercase: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub int: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub positive: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub negative: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub nonnegative: bool,
}

/// Date bounds are RFC 3339 strings or epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayDefinition {
    pub items: Box<Definition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<usize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nonempty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    #[serde(default)]
    pub shape: IndexMap<String, Definition>,
    #[serde(default)]
    pub unknown_keys: UnknownKeys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<Definition>>,
    pub value: Box<Definition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionDefinition {
    pub any_of: Vec<Definition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionDefinition {
    pub all_of: Vec<Definition>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Extend a JSON pointer by one reference token.
pub(crate) fn pointer_child(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, token.replace('~', "~0").replace('/', "~1"))
}

fn invalid(pointer: &str, message: impl Into<String>) -> DefinitionError {
    DefinitionError::InvalidDefinition {
        path: display_pointer(pointer),
        message: message.into(),
    }
}

pub(crate) fn display_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

impl Definition {
    /// A definition of `kind` with no modifiers.
    pub fn new(kind: DefinitionKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            coerce: false,
            default: None,
            allow: None,
            message: None,
        }
    }

    /// Decode a definition from parsed JSON.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::InvalidDefinition` if the document is not a
    /// well-formed definition.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DefinitionError> {
        serde_json::from_value(value).map_err(|err| invalid("", err.to_string()))
    }

    /// Name of the `"type"` tag.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            DefinitionKind::String(_) => "string",
            DefinitionKind::Number(_) => "number",
            DefinitionKind::Boolean => "boolean",
            DefinitionKind::Date(_) => "date",
            DefinitionKind::Enum(_) => "enum",
            DefinitionKind::Array(_) => "array",
            DefinitionKind::Object(_) => "object",
            DefinitionKind::Record(_) => "record",
            DefinitionKind::Union(_) => "union",
            DefinitionKind::Intersection(_) => "intersection",
        }
    }

    /// Build the schema this definition describes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` or `InvalidPattern` with the JSON pointer
    /// of the offending node.
    pub fn compile(&self) -> Result<Schema, DefinitionError> {
        self.compile_at("")
    }

    fn compile_at(&self, pointer: &str) -> Result<Schema, DefinitionError> {
        let schema = match &self.kind {
            DefinitionKind::String(rules) => self.finish(rules.build(pointer)?),
            DefinitionKind::Number(rules) => self.finish(rules.build()),
            DefinitionKind::Boolean => self.finish(boolean()),
            DefinitionKind::Date(rules) => self.finish(rules.build(pointer)?),
            DefinitionKind::Enum(rules) => {
                let mut values = Vec::with_capacity(rules.values.len());
                for (index, value) in rules.values.iter().enumerate() {
                    if !(value.is_string() || value.is_number()) {
                        let at = pointer_child(&pointer_child(pointer, "values"), &index.to_string());
                        return Err(invalid(&at, "enum values must be strings or numbers"));
                    }
                    values.push(Value::from(value));
                }
                self.finish(enumeration(values))
            }
            DefinitionKind::Array(rules) => self.finish(rules.build(pointer)?),
            DefinitionKind::Object(rules) => self.finish(rules.build(pointer)?),
            DefinitionKind::Record(rules) => {
                let value = rules.value.compile_at(&pointer_child(pointer, "value"))?;
                let schema = match &rules.key {
                    Some(key) => record_with_keys(key.compile_at(&pointer_child(pointer, "key"))?, value),
                    None => record(value),
                };
                self.finish(schema)
            }
            DefinitionKind::Union(rules) => {
                let at = pointer_child(pointer, "anyOf");
                let branches = compile_list(&rules.any_of, &at)?;
                self.finish(union(branches))
            }
            DefinitionKind::Intersection(rules) => {
                let at = pointer_child(pointer, "allOf");
                let mut branches = compile_list(&rules.all_of, &at)?.into_iter().rev();
                let Some(last) = branches.next() else {
                    return Err(invalid(&at, "intersection needs at least one branch"));
                };
                // Right-nested, same shape as chained `and`.
                let combined = branches.fold(last, |acc, prev| prev.and(acc).into_schema());
                self.finish(combined)
            }
        };

        let schema = if self.nullable { schema.nullable() } else { schema };
        let schema = if self.optional { schema.optional() } else { schema };

        // The default sits outside the wrappers so `null` or absent defaults survive them.
        let Some(default) = &self.default else {
            return Ok(schema);
        };
        let value = match &self.kind {
            DefinitionKind::Date(_) if !default.is_null() => {
                Value::Date(date_literal(default, &pointer_child(pointer, "default"))?)
            }
            _ => Value::from(default),
        };
        Ok(schema.default(value))
    }

    /// Apply the modifiers that configure the node itself.
    fn finish<S: Schematic>(&self, mut schema: S) -> Schema {
        if self.coerce {
            schema = schema.coerce();
        }
        if let Some(message) = &self.message {
            schema = schema.message(message.clone());
        }
        if let Some(allowed) = &self.allow {
            schema = schema.allow(allowed.iter().map(Value::from));
        }
        schema.into_schema()
    }
}

fn compile_list(definitions: &[Definition], pointer: &str) -> Result<Vec<Schema>, DefinitionError> {
    definitions
        .iter()
        .enumerate()
        .map(|(index, definition)| definition.compile_at(&pointer_child(pointer, &index.to_string())))
        .collect()
}

/// Read a date bound or default: RFC 3339 text or epoch milliseconds.
fn date_literal(value: &serde_json::Value, pointer: &str) -> Result<DateTime<Utc>, DefinitionError> {
    let parsed = match value {
        serde_json::Value::String(text) => parse_date_str(text),
        serde_json::Value::Number(n) => n.as_f64().and_then(date_from_millis),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(pointer, format!("expected a date, got {}", value)))
}

impl StringDefinition {
    fn build(&self, pointer: &str) -> Result<crate::primitive::StringSchema, DefinitionError> {
        let mut schema = string();
        if self.trim {
            schema = schema.trim();
        }
        if self.lowercase {
            schema = schema.to_lowercase();
        }
        if self.uppercase {
            schema = schema.to_uppercase();
        }
        if let Some(n) = self.length {
            schema = schema.length(n);
        }
        if let Some(n) = self.min {
            schema = schema.min(n);
        }
        if let Some(n) = self.exclusive_min {
            schema = schema.min_exclusive(n);
        }
        if let Some(n) = self.max {
            schema = schema.max(n);
        }
        if let Some(n) = self.exclusive_max {
            schema = schema.max_exclusive(n);
        }
        if self.nonempty {
            schema = schema.nonempty();
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|source| DefinitionError::InvalidPattern {
                path: pointer_child(pointer, "pattern"),
                source,
            })?;
            schema = schema.pattern(regex);
        }
        if let Some(prefix) = &self.starts_with {
            schema = schema.starts_with(prefix.clone());
        }
        if let Some(suffix) = &self.ends_with {
            schema = schema.ends_with(suffix.clone());
        }
        if let Some(needle) = &self.includes {
            schema = schema.includes(needle.clone());
        }
        if self.email {
            schema = schema.email();
        }
        Ok(schema)
    }
}

impl NumberDefinition {
    fn build(&self) -> crate::primitive::NumberSchema {
        let mut schema = number();
        if self.int {
            schema = schema.int();
        }
        if let Some(n) = self.min {
            schema = schema.min(n);
        }
        if let Some(n) = self.exclusive_min {
            schema = schema.min_exclusive(n);
        }
        if let Some(n) = self.max {
            schema = schema.max(n);
        }
        if let Some(n) = self.exclusive_max {
            schema = schema.max_exclusive(n);
        }
        if self.positive {
            schema = schema.positive();
        }
        if self.negative {
            schema = schema.negative();
        }
        if self.nonnegative {
            schema = schema.nonnegative();
        }
        schema
    }
}

impl DateDefinition {
    fn build(&self, pointer: &str) -> Result<crate::primitive::DateSchema, DefinitionError> {
        let mut schema = date();
        if let Some(bound) = &self.min {
            schema = schema.min(date_literal(bound, &pointer_child(pointer, "min"))?);
        }
        if let Some(bound) = &self.exclusive_min {
            schema = schema.min_exclusive(date_literal(bound, &pointer_child(pointer, "exclusiveMin"))?);
        }
        if let Some(bound) = &self.max {
            schema = schema.max(date_literal(bound, &pointer_child(pointer, "max"))?);
        }
        if let Some(bound) = &self.exclusive_max {
            schema = schema.max_exclusive(date_literal(bound, &pointer_child(pointer, "exclusiveMax"))?);
        }
        Ok(schema)
    }
}

impl ArrayDefinition {
    fn build(&self, pointer: &str) -> Result<ArraySchema, DefinitionError> {
        let items = self.items.compile_at(&pointer_child(pointer, "items"))?;
        let mut schema = crate::array::array(items);
        if let Some(n) = self.length {
            schema = schema.length(n);
        }
        if let Some(n) = self.min {
            schema = schema.min(n);
        }
        if let Some(n) = self.exclusive_min {
            schema = schema.min_exclusive(n);
        }
        if let Some(n) = self.max {
            schema = schema.max(n);
        }
        if let Some(n) = self.exclusive_max {
            schema = schema.max_exclusive(n);
        }
        if self.nonempty {
            schema = schema.nonempty();
        }
        Ok(schema)
    }
}

impl ObjectDefinition {
    fn build(&self, pointer: &str) -> Result<ObjectSchema, DefinitionError> {
        let shape = pointer_child(pointer, "shape");
        let mut schema = ObjectSchema::new().with_policy(self.unknown_keys);
        for (key, field) in &self.shape {
            schema = schema.field(key.clone(), field.compile_at(&pointer_child(&shape, key))?);
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathSegment;
    use serde_json::json;

    fn compile(value: serde_json::Value) -> Schema {
        Definition::from_json(value).unwrap().compile().unwrap()
    }

    #[test]
    fn decodes_tagged_nodes() {
        let def = Definition::from_json(json!({
            "type": "string",
            "min": 2,
            "optional": true
        }))
        .unwrap();
        assert_eq!(def.type_name(), "string");
        assert!(def.optional);
        match def.kind {
            DefinitionKind::String(rules) => assert_eq!(rules.min, Some(2)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_invalid_definition() {
        let err = Definition::from_json(json!({"type": "tuple"})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidDefinition { .. }));
    }

    #[test]
    fn compiles_object_tree() {
        let schema = compile(json!({
            "type": "object",
            "unknownKeys": "reject",
            "shape": {
                "email": { "type": "string", "email": true },
                "age": { "type": "number", "int": true, "min": 0, "optional": true },
                "tags": { "type": "array", "items": { "type": "string" }, "default": [] }
            }
        }));

        assert_eq!(
            schema.parse(json!({"email": "a@b.co"})).unwrap(),
            Value::from(json!({"email": "a@b.co", "tags": []}))
        );

        let err = schema
            .parse(json!({"email": "nope", "age": 1.5, "extra": true}))
            .unwrap_err();
        let codes: Vec<_> = err.errors.iter().map(|e| e.code()).collect();
        assert_eq!(
            codes,
            vec!["invalid_exact_value", "invalid_type", "unrecognized_keys"]
        );
        assert_eq!(err.errors[1].path, vec![PathSegment::from("age")]);
    }

    #[test]
    fn modifiers_wrap_in_order() {
        let schema = compile(json!({"type": "number", "nullable": true, "optional": true}));
        assert!(schema.is_optional());
        assert!(schema.parse(json!(null)).is_ok());
        assert!(schema.parse(Value::Undefined).is_ok());
    }

    #[test]
    fn null_default_is_kept() {
        let def = Definition::from_json(json!({"type": "number", "nullable": true, "default": null}))
            .unwrap();
        assert_eq!(def.default, Some(serde_json::Value::Null));
        assert_eq!(def.compile().unwrap().parse(Value::Undefined).unwrap(), Value::Null);
    }

    #[test]
    fn coerce_and_message() {
        let schema = compile(json!({"type": "number", "coerce": true, "message": "numbers only"}));
        assert_eq!(schema.parse("42").unwrap(), Value::Number(42.0));
        assert_eq!(schema.parse(json!([])).unwrap_err().message(), "numbers only");
    }

    #[test]
    fn union_and_intersection() {
        let schema = compile(json!({
            "type": "union",
            "anyOf": [{ "type": "string" }, { "type": "number" }]
        }));
        assert!(schema.parse(1).is_ok());
        assert!(schema.parse(true).is_err());

        let schema = compile(json!({
            "type": "intersection",
            "allOf": [
                { "type": "object", "shape": { "a": { "type": "string" } } },
                { "type": "object", "shape": { "b": { "type": "number" } } }
            ]
        }));
        assert_eq!(
            schema.parse(json!({"a": "x", "b": 2})).unwrap(),
            Value::from(json!({"a": "x", "b": 2}))
        );
    }

    #[test]
    fn empty_intersection_is_rejected() {
        let def = Definition::from_json(json!({"type": "intersection", "allOf": []})).unwrap();
        match def.compile().unwrap_err() {
            DefinitionError::InvalidDefinition { path, .. } => assert_eq!(path, "/allOf"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn bad_pattern_reports_pointer() {
        let def = Definition::from_json(json!({
            "type": "object",
            "shape": { "code": { "type": "string", "pattern": "([a-z" } }
        }))
        .unwrap();
        match def.compile().unwrap_err() {
            DefinitionError::InvalidPattern { path, .. } => assert_eq!(path, "/shape/code/pattern"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn enum_values_must_be_literals() {
        let def = Definition::from_json(json!({"type": "enum", "values": ["a", {}]})).unwrap();
        match def.compile().unwrap_err() {
            DefinitionError::InvalidDefinition { path, .. } => assert_eq!(path, "/values/1"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn date_bounds_and_defaults() {
        let schema = compile(json!({
            "type": "date",
            "coerce": true,
            "min": "2024-01-01",
            "default": "2024-06-01T00:00:00Z"
        }));
        assert!(schema.parse("2023-12-31").is_err());
        assert!(schema.parse("2024-02-01").is_ok());
        assert!(matches!(schema.parse(Value::Undefined).unwrap(), Value::Date(_)));

        let def = Definition::from_json(json!({"type": "date", "max": true})).unwrap();
        assert!(matches!(
            def.compile(),
            Err(DefinitionError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn nullable_date_accepts_null_default() {
        let schema = compile(json!({"type": "date", "nullable": true, "default": null}));
        assert_eq!(schema.parse(Value::Undefined).unwrap(), Value::Null);

        let def = Definition::from_json(json!({"type": "date", "default": null})).unwrap();
        let schema = def.compile().unwrap();
        assert_eq!(schema.parse(Value::Undefined).unwrap_err().errors[0].code(), "invalid_type");
    }

    #[test]
    fn record_with_key_definition() {
        let schema = compile(json!({
            "type": "record",
            "key": { "type": "string", "min": 2 },
            "value": { "type": "boolean" }
        }));
        assert!(schema.parse(json!({"ok": true})).is_ok());
        assert!(schema.parse(json!({"x": true})).is_err());
    }

    #[test]
    fn allow_list() {
        let schema = compile(json!({"type": "boolean", "allow": [true]}));
        assert!(schema.parse(true).is_ok());
        assert!(schema.parse(false).is_err());
    }

    #[test]
    fn serializes_back_to_camel_case() {
        let def = Definition::from_json(json!({
            "type": "string",
            "startsWith": "ab",
            "optional": true
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"type": "string", "startsWith": "ab", "optional": true})
        );
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        assert_eq!(pointer_child("/shape", "a/b~c"), "/shape/a~1b~0c");
    }
}
