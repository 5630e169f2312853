//! The versioned mutation capability.

use super::VersionedCollection;
use crate::error::VersionResult;
use crate::options::MutationOptions;
use histodb_store::{BulkWriteResult, DeleteResult, Document, Session};

/// Versioned mutations of single records and pre-fetched batches.
///
/// Code that only needs to persist records with history depends on this
/// trait rather than on a concrete collection.
pub trait VersionedStore {
    /// Inserts a new record at version 1, or archives the persisted record
    /// and writes `document` at the next version. See
    /// [`VersionedCollection::save`].
    fn save(
        &self,
        document: &mut Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<()>;

    /// Archives and deletes a record. See [`VersionedCollection::remove`].
    fn delete(
        &self,
        document: &Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult>;

    /// See [`VersionedCollection::bulk_save_versioned`].
    fn bulk_save(
        &self,
        documents: &mut [Document],
        originals: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult>;

    /// See [`VersionedCollection::bulk_delete_versioned`].
    fn bulk_delete(
        &self,
        documents: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult>;
}

impl VersionedStore for VersionedCollection {
    fn save(
        &self,
        document: &mut Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<()> {
        VersionedCollection::save(self, document, session, options)
    }

    fn delete(
        &self,
        document: &Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult> {
        self.remove(document, session, options)
    }

    fn bulk_save(
        &self,
        documents: &mut [Document],
        originals: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        self.bulk_save_versioned(documents, originals, session, options)
    }

    fn bulk_delete(
        &self,
        documents: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        self.bulk_delete_versioned(documents, session, options)
    }
}
