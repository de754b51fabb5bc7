//! Object schema: a declared shape, an unknown-key policy and shape algebra.
//!
//! Every declared key is validated in its own child context, so one parse
//! reports all failing fields. Keys outside the shape follow the policy:
//!
//! | Policy | Effect on undeclared keys |
//! |--------|---------------------------|
//! | `Strip` (default) | Dropped from the output |
//! | `Allow` | Copied to the output unchanged |
//! | `Reject` | One `UnrecognizedKeys` error listing them all |

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::{ParseResult, ParseStatus, ValidationContext};
use crate::enumeration::{enumeration, EnumSchema};
use crate::error::IssueKind;
use crate::schema::{Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::{Object, Value};

/// Policy for keys not present in the declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    #[default]
    Strip,
    Allow,
    Reject,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectShape {
    pub fields: IndexMap<String, Schema>,
    pub unknown_keys: UnknownKeys,
}

/// Schema for plain objects with a declared set of keys.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    shape: Arc<ObjectShape>,
    base: SchemaBase,
}

/// Create an object schema from `(key, schema)` pairs.
pub fn object<I, K, S>(shape: I) -> ObjectSchema
where
    I: IntoIterator<Item = (K, S)>,
    K: Into<String>,
    S: Into<Schema>,
{
    ObjectSchema::new().extend(shape)
}

impl ObjectSchema {
    /// An object schema with no declared keys.
    pub fn new() -> Self {
        Self {
            shape: Arc::new(ObjectShape::default()),
            base: SchemaBase::default(),
        }
    }

    /// Declared keys and their schemas, in declaration order.
    pub fn shape(&self) -> &IndexMap<String, Schema> {
        &self.shape.fields
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.shape.unknown_keys
    }

    /// Declared key list.
    pub fn keys(&self) -> Vec<String> {
        self.shape.fields.keys().cloned().collect()
    }

    /// Enumeration of the declared keys.
    pub fn keyof(&self) -> EnumSchema {
        enumeration(self.keys())
    }

    /// Declare (or replace) a single key.
    pub fn field(self, key: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.extend([(key.into(), schema.into())])
    }

    /// Add keys to the shape; new schemas replace existing ones on collision.
    pub fn extend<I, K, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<Schema>,
    {
        self.reshape(|shape| {
            for (key, schema) in fields {
                shape.fields.insert(key.into(), schema.into());
            }
        })
    }

    /// Combine two shapes. `other` wins key collisions and supplies the policy.
    pub fn merge(self, other: ObjectSchema) -> Self {
        let policy = other.shape.unknown_keys;
        self.reshape(|shape| {
            for (key, schema) in &other.shape.fields {
                shape.fields.insert(key.clone(), schema.clone());
            }
            shape.unknown_keys = policy;
        })
    }

    /// Keep only the listed keys.
    pub fn pick(self, keys: &[&str]) -> Self {
        self.reshape(|shape| shape.fields.retain(|key, _| keys.contains(&key.as_str())))
    }

    /// Drop the listed keys.
    pub fn omit(self, keys: &[&str]) -> Self {
        self.reshape(|shape| shape.fields.retain(|key, _| !keys.contains(&key.as_str())))
    }

    /// Make every key optional.
    pub fn partial(self) -> Self {
        self.reshape(|shape| {
            for schema in shape.fields.values_mut() {
                *schema = schema.clone().optional();
            }
        })
    }

    /// Make the listed keys optional.
    pub fn partial_keys(self, keys: &[&str]) -> Self {
        self.reshape(|shape| {
            for (key, schema) in shape.fields.iter_mut() {
                if keys.contains(&key.as_str()) {
                    *schema = schema.clone().optional();
                }
            }
        })
    }

    /// Remove `optional` from every key.
    pub fn required(self) -> Self {
        self.reshape(|shape| {
            for schema in shape.fields.values_mut() {
                *schema = schema.clone().required();
            }
        })
    }

    /// Remove `optional` from the listed keys.
    pub fn required_keys(self, keys: &[&str]) -> Self {
        self.reshape(|shape| {
            for (key, schema) in shape.fields.iter_mut() {
                if keys.contains(&key.as_str()) {
                    *schema = schema.clone().required();
                }
            }
        })
    }

    pub fn allow_unknown_keys(self) -> Self {
        self.with_policy(UnknownKeys::Allow)
    }

    pub fn reject_unknown_keys(self) -> Self {
        self.with_policy(UnknownKeys::Reject)
    }

    pub fn strip_unknown_keys(self) -> Self {
        self.with_policy(UnknownKeys::Strip)
    }

    pub fn with_policy(mut self, policy: UnknownKeys) -> Self {
        Arc::make_mut(&mut self.shape).unknown_keys = policy;
        self
    }

    /// Derive a new shape. Checks written against the old shape are not carried over.
    fn reshape(mut self, edit: impl FnOnce(&mut ObjectShape)) -> Self {
        edit(Arc::make_mut(&mut self.shape));
        self.base.checks.clear();
        self.base.default = None;
        self
    }
}

impl Schematic for ObjectSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema {
            kind: SchemaKind::Object(schema.shape),
            base: schema.base,
        }
    }
}

pub(crate) fn parse_object(
    shape: &ObjectShape,
    base: &SchemaBase,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let mut input = match value {
        Value::Object(map) => map,
        Value::Undefined => Object::new(),
        other => {
            ctx.invalid_type("object", &other, base.type_message());
            return ParseResult::Invalid;
        }
    };

    let mut status = ParseStatus::Valid;
    let mut output = Object::with_capacity(shape.fields.len());
    for (key, field) in &shape.fields {
        let item = input.shift_remove(key).unwrap_or_default();
        let mut child = ctx.child(key.as_str());
        let result = field.run_validation(item, &mut child);
        ctx.merge(child);
        status.absorb(result.status());
        match result.into_value() {
            Some(Value::Undefined) | None => {}
            Some(parsed) => {
                output.insert(key.clone(), parsed);
            }
        }
    }

    // Whatever is left in `input` was not declared.
    match shape.unknown_keys {
        UnknownKeys::Strip => {}
        UnknownKeys::Allow => output.extend(input),
        UnknownKeys::Reject if !input.is_empty() => {
            let keys: Vec<String> = input.into_keys().collect();
            let listed = keys
                .iter()
                .map(|key| format!("'{}'", key))
                .collect::<Vec<_>>()
                .join(", ");
            ctx.add_error(
                IssueKind::UnrecognizedKeys { keys },
                format!("Unrecognized key(s) in object: {}", listed),
            );
            status.absorb(ParseStatus::Dirty);
        }
        UnknownKeys::Reject => {}
    }

    status.into_result(Value::Object(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{boolean, number, string};
    use crate::types::PathSegment;
    use serde_json::json;

    fn person() -> ObjectSchema {
        ObjectSchema::new()
            .field("name", string())
            .field("age", number())
    }

    #[test]
    fn validates_declared_keys() {
        let output = person().parse(json!({"name": "Ada", "age": 36})).unwrap();
        assert_eq!(output, Value::from(json!({"name": "Ada", "age": 36})));
    }

    #[test]
    fn rejects_non_objects() {
        for input in [json!([]), json!(null), json!("x")] {
            let err = person().parse(input).unwrap_err();
            assert_eq!(err.errors.len(), 1);
            assert_eq!(err.errors[0].code(), "invalid_type");
        }
    }

    #[test]
    fn undefined_input_lets_defaults_populate() {
        let schema = object([("role", string().default("guest"))]);
        assert_eq!(
            schema.parse(Value::Undefined).unwrap(),
            Value::from(json!({"role": "guest"}))
        );
    }

    #[test]
    fn collects_errors_for_every_key() {
        let err = person().parse(json!({"name": 1})).unwrap_err();
        let paths: Vec<_> = err.errors.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec![PathSegment::from("name")],
                vec![PathSegment::from("age")]
            ]
        );
        assert_eq!(err.errors[1].message, "age is required");
    }

    #[test]
    fn optional_absent_fields_are_omitted() {
        let schema = person().partial_keys(&["age"]);
        let output = schema.parse(json!({"name": "Ada"})).unwrap();
        assert_eq!(output.as_object().unwrap().len(), 1);
        assert!(output.get("age").is_none());
    }

    #[test]
    fn strip_drops_unknown_keys() {
        let schema = object([("isValid", boolean())]);
        let output = schema
            .parse(json!({"isValid": true, "extra": "key"}))
            .unwrap();
        assert_eq!(output, Value::from(json!({"isValid": true})));
    }

    #[test]
    fn allow_passes_unknown_keys_through() {
        let schema = object([("isValid", boolean())]).allow_unknown_keys();
        let output = schema
            .parse(json!({"isValid": true, "extra": "key"}))
            .unwrap();
        assert_eq!(output, Value::from(json!({"isValid": true, "extra": "key"})));
    }

    #[test]
    fn reject_reports_unknown_keys_once() {
        let schema = object([("isValid", boolean())]).reject_unknown_keys();
        let err = schema
            .parse(json!({"isValid": true, "extra": "key", "more": 1}))
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(
            err.errors[0].kind,
            IssueKind::UnrecognizedKeys {
                keys: vec!["extra".into(), "more".into()]
            }
        );
        assert!(err.errors[0].path.is_empty());
    }

    #[test]
    fn reject_still_reports_field_errors() {
        let schema = object([("isValid", boolean())]).reject_unknown_keys();
        let err = schema
            .parse(json!({"isValid": "yes", "extra": "key"}))
            .unwrap_err();
        let codes: Vec<_> = err.errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["invalid_type", "unrecognized_keys"]);
    }

    #[test]
    fn object_checks_see_rejection_as_failure() {
        let schema = object([("a", number())])
            .reject_unknown_keys()
            .test(|_| true, "never fails");
        assert!(schema.parse(json!({"a": 1, "b": 2})).is_err());
    }

    #[test]
    fn pick_and_omit() {
        assert_eq!(person().pick(&["name"]).keys(), vec!["name".to_string()]);
        assert_eq!(person().omit(&["name"]).keys(), vec!["age".to_string()]);
    }

    #[test]
    fn partial_and_required_round_trip() {
        let partial = person().partial();
        assert!(partial.shape().values().all(Schema::is_optional));
        assert!(partial.parse(json!({})).is_ok());

        let required = partial.required();
        assert!(required.shape().values().all(|s| !s.is_optional()));
        assert!(required.parse(json!({})).is_err());

        let one = person().partial().required_keys(&["name"]);
        assert!(!one.shape()["name"].is_optional());
        assert!(one.shape()["age"].is_optional());
    }

    #[test]
    fn extend_and_merge_prefer_right_side() {
        let extended = person().extend([("age", string())]);
        assert_eq!(extended.shape()["age"].kind_name(), "string");

        let merged = person().merge(object([("email", string())]).reject_unknown_keys());
        assert_eq!(merged.keys(), vec!["name", "age", "email"]);
        assert_eq!(merged.unknown_keys(), UnknownKeys::Reject);
    }

    #[test]
    fn algebra_does_not_touch_receiver() {
        let original = person();
        let _ = original.clone().omit(&["age"]).partial();
        assert_eq!(original.keys(), vec!["name", "age"]);
        assert!(!original.shape()["name"].is_optional());
    }

    #[test]
    fn keyof_enumerates_keys() {
        let keys = person().keyof();
        assert!(keys.parse("name").is_ok());
        assert!(keys.parse("email").is_err());
    }

    #[test]
    fn nested_paths_extend_parent() {
        let schema = object([("buyer", object([("email", string().email())]))]);
        let err = schema
            .parse(json!({"buyer": {"email": "nope"}}))
            .unwrap_err();
        assert_eq!(
            err.errors[0].path,
            vec![PathSegment::from("buyer"), PathSegment::from("email")]
        );
    }
}
