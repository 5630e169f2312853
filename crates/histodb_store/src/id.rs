//! Document identifier.

use histodb_codec::Value;
use std::fmt;
use uuid::Uuid;

/// Generated identifier for a document.
///
/// Document IDs are 128-bit UUIDs stored in documents as a byte string.
/// Callers may use any [`Value`] as `_id`; this type is the default the
/// store hands out.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId([u8; 16]);

impl DocumentId {
    /// Creates a new random document ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Creates a document ID from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Reads a document ID back out of an `_id` value.
    ///
    /// Returns `None` if the value is not a 16-byte string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let bytes: [u8; 16] = value.as_bytes()?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Parses the hyphenated UUID form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(|u| Self(u.into_bytes()))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", Uuid::from_bytes(self.0))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::Bytes(id.0.to_vec())
    }
}
