//! Enumeration schema: membership in a fixed set of string or number literals.

use std::sync::Arc;

use serde::Serialize;

use crate::context::{ParseResult, ValidationContext};
use crate::error::IssueKind;
use crate::schema::{Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::Value;

/// Schema accepting one of a fixed set of literals.
#[derive(Debug, Clone)]
pub struct EnumSchema {
    options: Arc<Vec<Value>>,
    base: SchemaBase,
}

/// Create an enumeration from a list of literals.
pub fn enumeration<I, V>(values: I) -> EnumSchema
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    EnumSchema::new(values.into_iter().map(Into::into).collect())
}

impl EnumSchema {
    fn new(options: Vec<Value>) -> Self {
        Self {
            options: Arc::new(options),
            base: SchemaBase::default(),
        }
    }

    /// Enumerate the values of a plain object, as for a constant lookup table.
    pub fn from_object(object: &crate::types::Object) -> Self {
        Self::new(object.values().cloned().collect())
    }

    /// Enumerate native enum variants through their serde representation.
    ///
    /// Unit variants serialize as strings, so `#[serde(rename_all = "...")]`
    /// controls the accepted literals.
    pub fn from_variants<T: Serialize>(variants: &[T]) -> Result<Self, serde_json::Error> {
        let options = variants
            .iter()
            .map(|variant| serde_json::to_value(variant).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(options))
    }

    /// The declared members, in order.
    pub fn options(&self) -> &[Value] {
        &self.options
    }
}

impl Schematic for EnumSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<EnumSchema> for Schema {
    fn from(schema: EnumSchema) -> Self {
        Schema {
            kind: SchemaKind::Enum(schema.options),
            base: schema.base,
        }
    }
}

pub(crate) fn parse_enum(
    options: &[Value],
    base: &SchemaBase,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    if !matches!(value, Value::String(_) | Value::Number(_)) {
        ctx.invalid_type("string | number", &value, base.type_message());
        return ParseResult::Invalid;
    }
    if options.contains(&value) {
        return ParseResult::Valid(value);
    }

    let rendered = options
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ");
    ctx.add_error(
        IssueKind::UnrecognizedValue {
            options: options.to_vec(),
            received: value.clone(),
        },
        format!("Expected {} but received {}", rendered, value),
    );
    ParseResult::Invalid
}
