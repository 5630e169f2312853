//! Error types for the versioning engine.

use histodb_codec::Value;
use thiserror::Error;

/// Result type for versioning operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Errors that can occur in versioning operations.
#[derive(Debug, Error)]
pub enum VersionError {
    /// A caller schema declares a reserved metadata field.
    #[error("schema can't have a path called '{field}'")]
    SchemaConflict {
        /// The offending field name.
        field: String,
    },

    /// The live record targeted by a mutation no longer exists.
    #[error("record {id:?} not found in live collection")]
    NotFound {
        /// The record id.
        id: Value,
    },

    /// The record's version differs from the persisted version.
    #[error("concurrency conflict on {id:?}: expected version {expected}, found {found}")]
    ConcurrencyConflict {
        /// The record id.
        id: Value,
        /// Version carried by the caller's record.
        expected: u64,
        /// Version currently persisted (0 if the record is gone).
        found: u64,
    },

    /// Bulk save called with differently sized batches.
    #[error("documents and originals lengths do not match: {documents} vs {originals}")]
    LengthMismatch {
        /// Number of updated documents.
        documents: usize,
        /// Number of originals.
        originals: usize,
    },

    /// A batched live write affected fewer records than requested.
    #[error("bulk write failed, only {succeeded} out of {requested} were applied")]
    PartialBulkFailure {
        /// Records the store reported as written.
        succeeded: usize,
        /// Records in the batch.
        requested: usize,
    },

    /// Document is malformed or fails shape validation.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// Underlying store error.
    #[error("store error: {0}")]
    Store(#[from] histodb_store::StoreError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] histodb_codec::CodecError),
}

impl VersionError {
    /// Creates a schema conflict error.
    pub fn schema_conflict(field: impl Into<String>) -> Self {
        Self::SchemaConflict {
            field: field.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(id: &Value) -> Self {
        Self::NotFound { id: id.clone() }
    }

    /// Creates a concurrency conflict error.
    pub fn conflict(id: &Value, expected: u64, found: u64) -> Self {
        Self::ConcurrencyConflict {
            id: id.clone(),
            expected,
            found,
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Returns true for optimistic-concurrency failures.
    ///
    /// These are the errors a caller may want to answer by re-reading the
    /// record and retrying.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = VersionError::schema_conflict("_version");
        assert_eq!(e.to_string(), "schema can't have a path called '_version'");

        let e = VersionError::PartialBulkFailure {
            succeeded: 1,
            requested: 3,
        };
        assert_eq!(
            e.to_string(),
            "bulk write failed, only 1 out of 3 were applied"
        );
    }

    #[test]
    fn conflict_classification() {
        assert!(VersionError::conflict(&Value::from(1i64), 2, 3).is_conflict());
        assert!(!VersionError::not_found(&Value::from(1i64)).is_conflict());
    }
}
