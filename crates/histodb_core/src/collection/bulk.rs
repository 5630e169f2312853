//! Batched archive-then-advance for pre-fetched records.
//!
//! For callers already holding both the updated records and the originals
//! they were read as. Every record is stamped and checked up front, then the
//! live collection and the history collection each receive one batched
//! write in a shared session.

use super::interceptor::Attribution;
use super::VersionedCollection;
use crate::error::{VersionError, VersionResult};
use crate::options::MutationOptions;
use crate::util::{id_of, version_of};
use histodb_codec::Value;
use histodb_store::{BulkWriteResult, Document, Session, WriteOp};

impl VersionedCollection {
    /// Saves a batch of updated records against their originals.
    ///
    /// `originals[i]` must be the persisted state `documents[i]` was derived
    /// from. Each original is archived and each document is written at the
    /// next version. With `originals` empty the batch is a pure insert and
    /// every document gets version 1 (or, for a re-inserted `_id`, the
    /// version after its last archived one).
    ///
    /// Attribution follows [`save`](Self::save): a document carrying
    /// `_deleter` is archived with its deleter, any other with its editor.
    ///
    /// `documents` is updated in place only when the whole batch succeeds.
    ///
    /// # Errors
    ///
    /// - [`VersionError::LengthMismatch`] if the batches differ in size
    /// - [`VersionError::ConcurrencyConflict`] if a document's version
    ///   differs from its original's
    /// - [`VersionError::PartialBulkFailure`] if the live batch updates
    ///   fewer records than requested (a record moved or vanished)
    ///
    /// All checks that need no store access run before anything is written.
    pub fn bulk_save_versioned(
        &self,
        documents: &mut [Document],
        originals: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        self.logged("bulk_save_versioned", || {
            if !originals.is_empty() && originals.len() != documents.len() {
                return Err(VersionError::LengthMismatch {
                    documents: documents.len(),
                    originals: originals.len(),
                });
            }
            let now = self.config.clock.now();

            if originals.is_empty() {
                let (result, fresh) = self.atomic(session, |s| {
                    let fresh = documents
                        .iter()
                        .map(|d| self.fresh(d.clone(), now, &mut *s))
                        .collect::<VersionResult<Vec<_>>>()?;
                    let ops = fresh.iter().cloned().map(WriteOp::InsertOne).collect();
                    Ok((self.store.bulk_write(&self.live, ops, Some(s))?, fresh))
                })?;
                documents.clone_from_slice(&fresh);
                tracing::debug!(collection = %self.live, inserted = result.inserted, "bulk insert applied");
                return Ok(result);
            }

            let mut snapshots = Vec::with_capacity(documents.len());
            let mut updated = Vec::with_capacity(documents.len());
            let mut ops = Vec::with_capacity(documents.len());
            let mut expected = Vec::with_capacity(documents.len());

            for (document, original) in documents.iter().zip(originals) {
                let id = id_of(document)?;
                if id_of(original)? != id {
                    return Err(VersionError::invalid_document(format!(
                        "original for {id:?} has a different _id"
                    )));
                }
                let version = version_of(document)?;
                let base = version_of(original)?;
                if version != base {
                    return Err(VersionError::conflict(id, version, base));
                }

                let attribution = self.attribution_for(options, document);
                snapshots.push(self.snapshot(original, now, attribution)?);
                let next = self.advanced(document.clone(), base + 1, now)?;
                ops.push(WriteOp::ReplaceOne {
                    filter: Self::at_version(id, base),
                    replacement: next.clone(),
                });
                updated.push(next);
                expected.push((id.clone(), base));
            }

            let requested = ops.len();
            let result = self
                .atomic(session, |s| {
                    let result = self.store.bulk_write(&self.live, ops, Some(&mut *s))?;
                    Self::require(result.modified, requested)?;
                    self.store
                        .insert_many(&self.config.collection, snapshots, Some(s))?;
                    Ok(result)
                })
                .map_err(|e| self.explain(e, &expected))?;

            documents.clone_from_slice(&updated);
            tracing::debug!(collection = %self.live, updated = requested, "bulk save applied");
            Ok(result)
        })
    }

    /// Deletes a batch of records, archiving each with its deleter.
    ///
    /// The given records are archived as they are; each is deleted from the
    /// live collection only if it is still at its recorded version.
    ///
    /// # Errors
    ///
    /// [`VersionError::PartialBulkFailure`] if fewer records were deleted
    /// than requested.
    pub fn bulk_delete_versioned(
        &self,
        documents: &[Document],
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        self.logged("bulk_delete_versioned", || {
            let now = self.config.clock.now();
            let mut snapshots = Vec::with_capacity(documents.len());
            let mut ops = Vec::with_capacity(documents.len());
            let mut expected: Vec<(Value, u64)> = Vec::with_capacity(documents.len());

            for document in documents {
                let id = id_of(document)?;
                let version = version_of(document)?;
                let deleter = self.deleter_for(options, Some(document));
                snapshots.push(self.snapshot(document, now, Attribution::Deleter(deleter))?);
                ops.push(WriteOp::DeleteOne {
                    filter: Self::at_version(id, version),
                });
                expected.push((id.clone(), version));
            }

            let requested = ops.len();
            let result = self
                .atomic(session, |s| {
                    let result = self.store.bulk_write(&self.live, ops, Some(&mut *s))?;
                    Self::require(result.removed, requested)?;
                    self.store
                        .insert_many(&self.config.collection, snapshots, Some(s))?;
                    Ok(result)
                })
                .map_err(|e| self.explain(e, &expected))?;

            tracing::debug!(collection = %self.live, removed = requested, "bulk delete applied");
            Ok(result)
        })
    }

    fn require(succeeded: usize, requested: usize) -> VersionResult<()> {
        if succeeded < requested {
            return Err(VersionError::PartialBulkFailure {
                succeeded,
                requested,
            });
        }
        Ok(())
    }
}
