//! Shallow merge of JSON fields into entities.

use serde::Serialize;
use serde_json::Value;

use super::{Entity, Fields};

/// Serialize a value into a JSON object.
///
/// Fails if the value does not serialize to an object.
pub fn to_fields<S: Serialize + ?Sized>(value: &S) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Shallow-merge `overlay` into `entity`.
///
/// Overlay keys overwrite, absent keys are kept. The `id` key is never
/// overwritten so identity is stable across merges.
pub fn merge_fields<T: Entity>(entity: &T, overlay: &Fields) -> Result<T, serde_json::Error> {
    let mut fields = to_fields(entity)?;
    for (key, value) in overlay {
        if key == "id" {
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(fields))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
