//! Payload validation against declarative definitions.

use crate::definition::Definition;
use crate::error::ValidateError;
use crate::schema::Schematic;
use crate::types::Value;

/// Validate a payload against a JSON definition document.
///
/// Decodes and compiles the definition, then parses the payload with it.
/// Returns the schema's output, which may differ from the input when the
/// definition strips keys, fills defaults or normalizes strings.
///
/// # Errors
///
/// Returns `ValidateError::Definition` if the definition can't be compiled, or
/// `ValidateError::Invalid` if the payload doesn't match it.
pub fn validate(definition: &serde_json::Value, payload: &serde_json::Value) -> Result<Value, ValidateError> {
    let definition = Definition::from_json(definition.clone())?;
    validate_with_definition(&definition, payload)
}

/// Validate a payload against an already-decoded definition.
///
/// Use this when the definition was loaded once and many payloads follow.
pub fn validate_with_definition(
    definition: &Definition,
    payload: &serde_json::Value,
) -> Result<Value, ValidateError> {
    let schema = definition.compile()?;
    Ok(schema.parse(payload)?)
}
