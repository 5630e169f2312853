//! Index declarations.

use crate::document::Document;
use crate::filter::SortOrder;
use histodb_codec::Value;

/// A declared index on a collection.
///
/// The in-memory store resolves every query by scanning, so indexes here
/// carry no lookup structure. They are recorded so callers can inspect what
/// was requested, and unique indexes are enforced on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    name: String,
    keys: Vec<(String, SortOrder)>,
    unique: bool,
}

impl IndexSpec {
    /// Creates an index over the given key paths.
    pub fn new(name: impl Into<String>, keys: Vec<(String, SortOrder)>) -> Self {
        Self {
            name: name.into(),
            keys,
            unique: false,
        }
    }

    /// Creates a single-field ascending index named after the field.
    pub fn on(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(format!("{path}_1"), vec![(path, SortOrder::Ascending)])
    }

    /// Marks the index as unique.
    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key paths and directions.
    #[must_use]
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    /// Returns true if the index is unique.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Extracts this index's key values from a document.
    ///
    /// Returns `None` when the document holds none of the indexed fields;
    /// such documents never collide on a unique index.
    pub(crate) fn extract<'a>(&self, doc: &'a Document) -> Option<Vec<Option<&'a Value>>> {
        let values: Vec<_> = self.keys.iter().map(|(p, _)| doc.get_path(p)).collect();
        values.iter().any(Option::is_some).then_some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_field_name() {
        let index = IndexSpec::on("email").unique(true);
        assert_eq!(index.name(), "email_1");
        assert!(index.is_unique());
    }

    #[test]
    fn extract_skips_documents_without_fields() {
        let index = IndexSpec::on("email");
        assert!(index.extract(&Document::new().with("other", 1i64)).is_none());
        let doc = Document::new().with("email", "a@b");
        assert_eq!(index.extract(&doc), Some(vec![Some(&Value::from("a@b"))]));
    }
}
