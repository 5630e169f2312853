//! Per-call mutation options.

use histodb_store::Sort;

/// Which document a `find_one_and_*` operation returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The record as it was before the operation.
    #[default]
    Before,
    /// The record as it is after the operation.
    After,
}

/// Options accepted by every versioned mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    /// Editor recorded on archived snapshots of updates.
    pub editor: Option<String>,
    /// Deleter recorded on archived snapshots of deletions.
    pub deleter: Option<String>,
    /// Resolution order for `find_one_and_*` operations.
    pub sort: Option<Sort>,
    /// Accepted for compatibility and ignored.
    pub skip: usize,
    /// Which document `find_one_and_*` operations return.
    pub return_document: ReturnDocument,
}

impl MutationOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the editor identity.
    #[must_use]
    pub fn editor(mut self, editor: impl Into<String>) -> Self {
        self.editor = Some(editor.into());
        self
    }

    /// Sets the deleter identity.
    #[must_use]
    pub fn deleter(mut self, deleter: impl Into<String>) -> Self {
        self.deleter = Some(deleter.into());
        self
    }

    /// Sets the resolution order.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the (ignored) skip count.
    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Sets which document `find_one_and_*` returns.
    #[must_use]
    pub const fn return_document(mut self, which: ReturnDocument) -> Self {
        self.return_document = which;
        self
    }
}
