//! Operation options and results.

use crate::document::Document;
use crate::filter::{Filter, Sort};
use crate::update::Update;
use histodb_codec::Value;

/// Options for single-document lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Order in which candidates are considered.
    pub sort: Option<Sort>,
    /// Number of matching documents to pass over.
    pub skip: usize,
}

impl FindOptions {
    /// Lookup with a sort order.
    #[must_use]
    pub fn sorted(sort: Sort) -> Self {
        Self {
            sort: Some(sort),
            skip: 0,
        }
    }
}

/// Result of inserting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document (generated if it had none).
    pub inserted_id: Value,
}

/// Result of inserting many documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    /// The `_id` of every inserted document, in input order.
    pub inserted_ids: Vec<Value>,
}

/// Result of an update or replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents that matched the filter.
    pub matched: usize,
    /// Documents whose content actually changed.
    pub modified: usize,
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Documents removed.
    pub deleted: usize,
}

/// One operation in a batched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert a document.
    InsertOne(Document),
    /// Replace the first document matching `filter`.
    ReplaceOne {
        /// Selector.
        filter: Filter,
        /// New content (the original `_id` is kept).
        replacement: Document,
    },
    /// Update the first document matching `filter`.
    UpdateOne {
        /// Selector.
        filter: Filter,
        /// Change to apply.
        update: Update,
    },
    /// Delete the first document matching `filter`.
    DeleteOne {
        /// Selector.
        filter: Filter,
    },
}

/// Aggregate counts of a batched write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    /// Documents inserted.
    pub inserted: usize,
    /// Documents matched by replace/update operations.
    pub matched: usize,
    /// Documents changed by replace/update operations.
    pub modified: usize,
    /// Documents deleted.
    pub removed: usize,
}

impl BulkWriteResult {
    /// Adds another result's counts to this one.
    pub fn absorb(&mut self, other: BulkWriteResult) {
        self.inserted += other.inserted;
        self.matched += other.matched;
        self.modified += other.modified;
        self.removed += other.removed;
    }
}
