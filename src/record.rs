//! Record schema: arbitrary keys, one schema for every value.

use std::sync::Arc;

use crate::context::{ParseResult, ParseStatus, ValidationContext};
use crate::error::IssueKind;
use crate::schema::{Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::{Object, Value};

/// Schema for string-keyed dictionaries and key/value maps.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    key: Option<Arc<Schema>>,
    value: Arc<Schema>,
    base: SchemaBase,
}

/// Record whose keys are unconstrained strings.
pub fn record(value: impl Schematic) -> RecordSchema {
    RecordSchema {
        key: None,
        value: Arc::new(value.into()),
        base: SchemaBase::default(),
    }
}

/// Record whose keys are validated by `key`.
///
/// On object input, two keys that the key schema maps to the same output key
/// are an error reported at the later key. Map input keeps both entries.
pub fn record_with_keys(key: impl Schematic, value: impl Schematic) -> RecordSchema {
    RecordSchema {
        key: Some(Arc::new(key.into())),
        value: Arc::new(value.into()),
        base: SchemaBase::default(),
    }
}

impl RecordSchema {
    pub fn key_schema(&self) -> Option<&Schema> {
        self.key.as_deref()
    }

    pub fn value_schema(&self) -> &Schema {
        &self.value
    }
}

impl Schematic for RecordSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<RecordSchema> for Schema {
    fn from(schema: RecordSchema) -> Self {
        Schema {
            kind: SchemaKind::Record {
                key: schema.key,
                value: schema.value,
            },
            base: schema.base,
        }
    }
}

/// Validated key and value for one entry; `None` when either side failed.
fn parse_entry(
    key_schema: Option<&Schema>,
    value_schema: &Schema,
    key: Value,
    value: Value,
    ctx: &mut ValidationContext,
    status: &mut ParseStatus,
) -> Option<(Value, Value)> {
    let mut child = ctx.child(key.to_display_string());
    let key = match key_schema {
        Some(schema) => {
            let result = schema.run_validation(key, &mut child);
            status.absorb(result.status());
            result.into_value()
        }
        None => Some(key),
    };
    let result = value_schema.run_validation(value, &mut child);
    status.absorb(result.status());
    ctx.merge(child);
    Some((key?, result.into_value()?))
}

pub(crate) fn parse_record(
    key_schema: Option<&Schema>,
    value_schema: &Schema,
    base: &SchemaBase,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let mut status = ParseStatus::Valid;
    match value {
        Value::Object(entries) => {
            let mut output = Object::with_capacity(entries.len());
            for (key, item) in entries {
                let parsed = parse_entry(
                    key_schema,
                    value_schema,
                    Value::String(key.clone()),
                    item,
                    ctx,
                    &mut status,
                );
                let Some((parsed_key, item)) = parsed else { continue };
                // Object keys stay strings whatever the key schema produced.
                let parsed_key = parsed_key.to_display_string();
                if output.contains_key(&parsed_key) {
                    let mut child = ctx.child(key);
                    child.add_error(
                        IssueKind::InvalidExactValue {
                            expected: Value::Undefined,
                            received: Value::String(parsed_key.clone()),
                        },
                        format!("Key '{}' collides with an earlier key", parsed_key),
                    );
                    ctx.merge(child);
                    status.absorb(ParseStatus::Invalid);
                    continue;
                }
                output.insert(parsed_key, item);
            }
            status.into_result(Value::Object(output))
        }
        Value::Map(entries) => {
            let mut output = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                let parsed =
                    parse_entry(key_schema, value_schema, key, item, ctx, &mut status);
                output.extend(parsed);
            }
            status.into_result(Value::Map(output))
        }
        other => {
            ctx.invalid_type("object", &other, base.type_message());
            ParseResult::Invalid
        }
    }
}
