//! Error types for the document store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] histodb_codec::CodecError),

    /// A document with the same key (or unique index value) already exists.
    #[error("duplicate key in collection {collection}: {detail}")]
    DuplicateKey {
        /// The collection written to.
        collection: String,
        /// Which key or index collided.
        detail: String,
    },

    /// A document read by the session changed before the session committed.
    #[error("transaction conflict in collection {collection}")]
    TransactionConflict {
        /// The collection where the conflict occurred.
        collection: String,
    },

    /// Document is structurally unusable (not a map, missing `_id`).
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates a duplicate key error.
    pub fn duplicate_key(collection: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DuplicateKey {
            collection: collection.into(),
            detail: detail.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error is a commit-time conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }
}
