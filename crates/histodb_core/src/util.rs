//! Small helpers shared by the engine and its callers.

use crate::error::{VersionError, VersionResult};
use crate::fields;
use histodb_codec::{Timestamp, Value};
use histodb_store::Document;

/// Parses a version number supplied as text.
///
/// Accepts only positive decimal integers: no sign, no whitespace, no
/// fractional part.
///
/// ```
/// use histodb_core::parse_version;
///
/// assert_eq!(parse_version("3"), Some(3));
/// assert_eq!(parse_version("0"), None);
/// assert_eq!(parse_version(" 3"), None);
/// ```
#[must_use]
pub fn parse_version(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u64>().ok().filter(|v| *v >= 1)
}

/// Reads `_version`; absent or null means a record never persisted (0).
pub(crate) fn version_of(doc: &Document) -> VersionResult<u64> {
    match doc.get(fields::VERSION) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Integer(v)) => u64::try_from(*v)
            .map_err(|_| VersionError::invalid_document(format!("negative _version {v}"))),
        Some(other) => Err(VersionError::invalid_document(format!(
            "_version must be an integer, got {}",
            other.kind_name()
        ))),
    }
}

pub(crate) fn version_value(version: u64) -> Value {
    Value::Integer(i64::try_from(version).unwrap_or(i64::MAX))
}

/// Reads `_validity.start`.
pub(crate) fn validity_start(doc: &Document) -> VersionResult<Timestamp> {
    doc.get_path(fields::VALIDITY_START)
        .and_then(Value::as_timestamp)
        .ok_or_else(|| VersionError::invalid_document("record has no _validity.start"))
}

pub(crate) fn id_of(doc: &Document) -> VersionResult<&Value> {
    doc.id()
        .ok_or_else(|| VersionError::invalid_document("record has no _id"))
}

/// The `_id` of the history record archiving `version` of `id`.
#[must_use]
pub fn history_id(id: &Value, version: u64) -> Value {
    Value::text_map([
        (fields::ID, id.clone()),
        (fields::VERSION, version_value(version)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version_accepts_positive_integers() {
        assert_eq!(parse_version("1"), Some(1));
        assert_eq!(parse_version("42"), Some(42));
        assert_eq!(parse_version("007"), Some(7));
    }

    #[test]
    fn parse_version_rejects_everything_else() {
        for text in ["", " ", "0", "-1", "+1", "1.5", "abc", "1e3", " 2", "2 ", "99999999999999999999999"] {
            assert_eq!(parse_version(text), None, "{text:?}");
        }
    }

    #[test]
    fn version_of_reads_integer() {
        assert_eq!(version_of(&Document::new()).unwrap(), 0);
        let doc = Document::new().with(fields::VERSION, 3i64);
        assert_eq!(version_of(&doc).unwrap(), 3);
        let doc = Document::new().with(fields::VERSION, -1i64);
        assert!(version_of(&doc).is_err());
        let doc = Document::new().with(fields::VERSION, "3");
        assert!(version_of(&doc).is_err());
    }

    #[test]
    fn history_id_shape() {
        let id = history_id(&Value::from("x"), 2);
        assert_eq!(id.get("_id"), Some(&Value::from("x")));
        assert_eq!(id.get("_version"), Some(&Value::Integer(2)));
    }
}
