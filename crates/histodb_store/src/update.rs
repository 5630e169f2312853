//! Update descriptions applied to matched documents.

use crate::document::{Document, ID_FIELD};
use histodb_codec::Value;

/// How a matched document is changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Partial update: set each listed path, leave everything else.
    Set(Vec<(String, Value)>),
    /// Partial update: remove each listed top-level field.
    Unset(Vec<String>),
    /// Whole-document replacement. The original `_id` is always kept.
    Replace(Document),
}

impl Update {
    /// Partial update of a single path.
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set(vec![(path.into(), value.into())])
    }

    /// Adds another path to a `Set` update.
    ///
    /// Ignored on other update kinds.
    #[must_use]
    pub fn and_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Update::Set(pairs) = &mut self {
            pairs.push((path.into(), value.into()));
        }
        self
    }

    /// Whole-document replacement.
    #[must_use]
    pub fn replace(document: Document) -> Self {
        Self::Replace(document)
    }

    /// Returns true for whole-document replacement.
    #[must_use]
    pub fn is_replace(&self) -> bool {
        matches!(self, Update::Replace(_))
    }

    /// Drops every path for which `keep` returns false.
    ///
    /// Paths are tested by their top-level field name.
    #[must_use]
    pub fn retain_fields(self, keep: impl Fn(&str) -> bool) -> Self {
        let root = |path: &str| path.split('.').next().unwrap_or(path).to_string();
        match self {
            Update::Set(pairs) => {
                Update::Set(pairs.into_iter().filter(|(p, _)| keep(&root(p))).collect())
            }
            Update::Unset(fields) => {
                Update::Unset(fields.into_iter().filter(|f| keep(&root(f))).collect())
            }
            Update::Replace(doc) => Update::Replace(
                doc.iter()
                    .filter(|(name, _)| keep(name))
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            ),
        }
    }

    /// Applies the update to a document, producing the new document.
    #[must_use]
    pub fn apply(&self, original: &Document) -> Document {
        match self {
            Update::Set(pairs) => {
                let mut doc = original.clone();
                for (path, value) in pairs {
                    doc.set_path(path, value.clone());
                }
                doc
            }
            Update::Unset(fields) => {
                let mut doc = original.clone();
                for field in fields {
                    if field != ID_FIELD {
                        doc.remove(field);
                    }
                }
                doc
            }
            Update::Replace(replacement) => {
                let mut doc = replacement.clone();
                match original.id() {
                    Some(id) => doc.insert(ID_FIELD, id.clone()),
                    None => doc.remove(ID_FIELD),
                };
                doc
            }
        }
    }
}
