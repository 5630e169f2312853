//! Conversion between JSON and document values.
//!
//! JSON has no timestamp or byte string, so those travel as single-key
//! objects: `{"$timestamp": <millis>}` and `{"$bytes": "<hex>"}`.

use histodb_codec::{Timestamp, Value};
use histodb_store::Document;
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

const TIMESTAMP_KEY: &str = "$timestamp";
const BYTES_KEY: &str = "$bytes";

/// JSON that has no document representation.
#[derive(Debug, Error)]
pub enum JsonError {
    /// Floats (and integers beyond i64) are not storable.
    #[error("unsupported number {0}: only 64-bit integers are stored")]
    Number(Number),

    /// A `$timestamp` or `$bytes` wrapper with a malformed payload.
    #[error("malformed {key} value: {detail}")]
    Wrapper {
        /// The wrapper key.
        key: &'static str,
        /// What was wrong.
        detail: String,
    },

    /// A document must be a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),
}

/// Converts JSON into a value.
pub fn to_value(json: &Json) -> Result<Value, JsonError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Integer(n.as_i64().ok_or_else(|| JsonError::Number(n.clone()))?),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(to_value).collect::<Result<_, _>>()?),
        Json::Object(map) => {
            if let Some(wrapped) = unwrap_special(map)? {
                return Ok(wrapped);
            }
            Value::text_map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), to_value(v)?)))
                    .collect::<Result<Vec<_>, JsonError>>()?,
            )
        }
    })
}

/// Converts a JSON object into a document.
pub fn to_document(json: &Json) -> Result<Document, JsonError> {
    let Json::Object(map) = json else {
        return Err(JsonError::NotAnObject(json.to_string()));
    };
    map.iter().try_fold(Document::new(), |doc, (field, value)| {
        Ok(doc.with(field.clone(), to_value(value)?))
    })
}

/// Converts a value into JSON.
pub fn from_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::from(*i),
        Value::Timestamp(ts) => wrapper(TIMESTAMP_KEY, Json::from(ts.as_millis())),
        Value::Bytes(bytes) => wrapper(BYTES_KEY, Json::String(hex(bytes))),
        Value::Text(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(from_value).collect()),
        Value::Map(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                let key = match key {
                    Value::Text(s) => s.clone(),
                    other => from_value(other).to_string(),
                };
                map.insert(key, from_value(value));
            }
            Json::Object(map)
        }
    }
}

/// Converts a document into a JSON object.
pub fn from_document(doc: &Document) -> Json {
    Json::Object(
        doc.iter()
            .map(|(field, value)| (field.to_string(), from_value(value)))
            .collect(),
    )
}

fn unwrap_special(map: &Map<String, Json>) -> Result<Option<Value>, JsonError> {
    if map.len() != 1 {
        return Ok(None);
    }
    if let Some(millis) = map.get(TIMESTAMP_KEY) {
        let millis = millis.as_i64().ok_or_else(|| JsonError::Wrapper {
            key: TIMESTAMP_KEY,
            detail: format!("expected integer milliseconds, got {millis}"),
        })?;
        return Ok(Some(Value::Timestamp(Timestamp::from_millis(millis))));
    }
    if let Some(text) = map.get(BYTES_KEY) {
        let bytes = text.as_str().and_then(unhex).ok_or_else(|| JsonError::Wrapper {
            key: BYTES_KEY,
            detail: format!("expected an even-length hex string, got {text}"),
        })?;
        return Ok(Some(Value::Bytes(bytes)));
    }
    Ok(None)
}

fn wrapper(key: &str, payload: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), payload);
    Json::Object(map)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn unhex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}
