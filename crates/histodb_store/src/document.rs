//! Documents: named fields holding dynamic values.

use crate::error::{StoreError, StoreResult};
use histodb_codec::{from_cbor, to_cbor, CodecResult, Value};
use std::collections::BTreeMap;

/// Name of the primary key field.
pub const ID_FIELD: &str = "_id";

/// A document stored in a collection.
///
/// Top-level fields are kept in a map keyed by name; nested structure lives
/// in [`Value::Map`] values and is addressed with dotted paths
/// (`"_validity.start"`).
///
/// Documents are plain values. Reading from the store hands out a decoded
/// copy, so mutating a document never affects stored state until it is
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a top-level field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Gets a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Gets a field by dotted path.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.fields.get(path),
            Some((head, rest)) => self.fields.get(head)?.get_path(rest),
        }
    }

    /// Sets a field by dotted path, creating intermediate maps as needed.
    ///
    /// An intermediate segment holding a non-map value is replaced by a map.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        match path.split_once('.') {
            None => {
                self.fields.insert(path.to_string(), value);
            }
            Some((head, rest)) => {
                let slot = self
                    .fields
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Map(Vec::new()));
                set_nested(slot, rest, value);
            }
        }
    }

    /// Removes a top-level field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the top-level field is present.
    #[must_use]
    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the `_id` value, if set.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts to a map value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::text_map(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Builds a document from a map value with text keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a map or has a non-text key.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let Value::Map(pairs) = value else {
            return Err(StoreError::invalid_document(format!(
                "expected map, got {}",
                value.kind_name()
            )));
        };

        let mut fields = BTreeMap::new();
        for (key, val) in pairs {
            let Value::Text(name) = key else {
                return Err(StoreError::invalid_document("field names must be text"));
            };
            fields.insert(name, val);
        }
        Ok(Self { fields })
    }

    /// Encodes the document to CBOR bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(&self.to_value())
    }

    /// Decodes a document from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a CBOR map.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        Self::from_value(from_cbor(bytes)?)
    }

    /// Returns the storage key: the deterministic encoding of `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no `_id`.
    pub fn key(&self) -> StoreResult<Vec<u8>> {
        let id = self
            .id()
            .ok_or_else(|| StoreError::invalid_document("document has no _id"))?;
        Ok(to_cbor(id)?)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn set_nested(slot: &mut Value, path: &str, value: Value) {
    if !matches!(slot, Value::Map(_)) {
        *slot = Value::Map(Vec::new());
    }
    let Value::Map(pairs) = slot else {
        return;
    };

    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let index = match pairs.iter().position(|(k, _)| k.as_text() == Some(head)) {
        Some(index) => index,
        None => {
            pairs.push((Value::from(head), Value::Null));
            pairs.len() - 1
        }
    };

    match rest {
        Some(rest) => set_nested(&mut pairs[index].1, rest, value),
        None => pairs[index].1 = value,
    }
    pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use histodb_codec::Timestamp;

    #[test]
    fn builder_and_get() {
        let doc = Document::new().with("data", "a").with("n", 3i64);
        assert_eq!(doc.get("data"), Some(&Value::from("a")));
        assert_eq!(doc.get("n"), Some(&Value::Integer(3)));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn set_path_creates_maps() {
        let mut doc = Document::new();
        doc.set_path("_validity.start", Timestamp::from_millis(10));
        doc.set_path("_validity.end", Timestamp::from_millis(20));

        assert_eq!(
            doc.get_path("_validity.start"),
            Some(&Value::Timestamp(Timestamp::from_millis(10)))
        );
        assert_eq!(
            doc.get_path("_validity.end"),
            Some(&Value::Timestamp(Timestamp::from_millis(20)))
        );
    }

    #[test]
    fn set_path_replaces_scalar() {
        let mut doc = Document::new().with("_validity", 5i64);
        doc.set_path("_validity.start", Timestamp::from_millis(1));
        assert!(doc.get("_validity").unwrap().as_map().is_some());
    }

    #[test]
    fn set_path_overwrites_existing_leaf() {
        let mut doc = Document::new();
        doc.set_path("a.b", 1i64);
        doc.set_path("a.b", 2i64);
        assert_eq!(doc.get("a").unwrap().as_map().unwrap().len(), 1);
        assert_eq!(doc.get_path("a.b"), Some(&Value::Integer(2)));
    }

    #[test]
    fn encode_decode() {
        let doc = Document::new()
            .with(ID_FIELD, Value::Bytes(vec![1; 16]))
            .with("data", "x");
        let bytes = doc.encode().unwrap();
        assert_eq!(Document::decode(&bytes).unwrap(), doc);
    }

    #[test]
    fn from_value_rejects_non_map() {
        assert!(Document::from_value(Value::Integer(1)).is_err());
        assert!(Document::from_value(Value::map(vec![(Value::Integer(1), Value::Null)])).is_err());
    }

    #[test]
    fn key_requires_id() {
        assert!(Document::new().key().is_err());
        let a = Document::new().with(ID_FIELD, "x").with("data", 1i64);
        let b = Document::new().with(ID_FIELD, "x").with("data", 2i64);
        assert_eq!(a.key().unwrap(), b.key().unwrap());
    }
}
