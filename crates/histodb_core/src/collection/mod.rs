//! Versioned collections.
//!
//! A [`VersionedCollection`] pairs a live collection with its history
//! collection in one [`DocumentStore`]. Every mutation goes through it:
//!
//! - inserts stamp version 1 and a validity start
//! - updates archive the persisted record to history with a closed validity
//!   interval, then write the live record with its version advanced
//! - deletes archive the persisted record with its deleter, then remove it
//!
//! The archive write and the live write always share one store session.
//! When the caller passes a session, both land in it and nothing is visible
//! until the caller commits. Otherwise the collection opens its own session
//! and commits it before returning.

mod bulk;
mod interceptor;
mod lookup;
mod query;
mod versioned_store;

pub use versioned_store::VersionedStore;

use crate::config::VersioningConfig;
use crate::error::{VersionError, VersionResult};
use crate::fields;
use crate::schema::{augment, check_reserved, AugmentedSchema, Schema};
use crate::util::{history_id, version_of, version_value};
use histodb_codec::Value;
use histodb_store::{
    Document, DocumentStore, Filter, FindOptions, Session, Sort, StoreError,
};
use std::sync::Arc;

/// A live collection whose every mutation is versioned.
#[derive(Debug)]
pub struct VersionedCollection {
    store: Arc<DocumentStore>,
    live: String,
    shapes: AugmentedSchema,
    config: VersioningConfig,
}

impl VersionedCollection {
    /// Sets up versioning for `live` in `store`.
    ///
    /// Checks the schema for reserved fields, derives the live and history
    /// shapes, registers unique indexes on the live collection and, when
    /// `config.ensure_index` is set, the temporal index on the history
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::SchemaConflict`] if the schema declares a
    /// reserved field, or a store error if an index can't be registered.
    pub fn new(
        store: Arc<DocumentStore>,
        live: impl Into<String>,
        schema: &Schema,
        config: VersioningConfig,
    ) -> VersionResult<Self> {
        let live = live.into();
        check_reserved(schema)?;
        if live == config.collection {
            return Err(StoreError::invalid_operation(format!(
                "history collection must differ from live collection {live}"
            ))
            .into());
        }

        let shapes = augment(schema);
        for index in &shapes.live_indexes {
            store.create_index(&live, index.clone())?;
        }
        if config.ensure_index {
            store.create_index(&config.collection, shapes.history_index.clone())?;
        }

        tracing::debug!(
            live = %live,
            history = %config.collection,
            fields = schema.fields().len(),
            "versioned collection ready"
        );

        Ok(Self {
            store,
            live,
            shapes,
            config,
        })
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Returns the live collection name.
    #[must_use]
    pub fn live_collection(&self) -> &str {
        &self.live
    }

    /// Returns the history collection name.
    #[must_use]
    pub fn history_collection(&self) -> &str {
        &self.config.collection
    }

    /// Returns the derived live and history shapes.
    #[must_use]
    pub fn schema(&self) -> &AugmentedSchema {
        &self.shapes
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    /// Reads the first live record matching `filter`.
    pub fn find_one(
        &self,
        filter: &Filter,
        options: &FindOptions,
        session: Option<&mut Session>,
    ) -> VersionResult<Option<Document>> {
        Ok(self.store.find_one(&self.live, filter, options, session)?)
    }

    /// Reads every live record matching `filter`.
    pub fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
        session: Option<&mut Session>,
    ) -> VersionResult<Vec<Document>> {
        Ok(self.store.find(&self.live, filter, options, session)?)
    }

    /// Returns every archived version of `id`, oldest first.
    pub fn history_of(
        &self,
        id: &Value,
        session: Option<&mut Session>,
    ) -> VersionResult<Vec<Document>> {
        let options = FindOptions::sorted(Sort::ascending(fields::VERSION));
        Ok(self.store.find(
            &self.config.collection,
            &Filter::eq(fields::HISTORY_ID, id.clone()),
            &options,
            session,
        )?)
    }

    /// Filter selecting the live record `id` at exactly `version`.
    pub(crate) fn at_version(id: &Value, version: u64) -> Filter {
        Filter::eq(fields::ID, id.clone()).and(Filter::eq(fields::VERSION, version_value(version)))
    }

    /// Filter selecting the history record archiving `version` of `id`.
    pub(crate) fn archived(id: &Value, version: u64) -> Filter {
        Filter::eq(fields::ID, history_id(id, version))
    }

    /// Runs `f` in the caller's session, or in an internal one that is
    /// committed on success and aborted on failure.
    pub(crate) fn atomic<T>(
        &self,
        session: Option<&mut Session>,
        f: impl FnOnce(&mut Session) -> VersionResult<T>,
    ) -> VersionResult<T> {
        match session {
            Some(session) => f(session),
            None => self.store.transaction(f),
        }
    }

    /// Maps a store-level collision to the record that moved underneath it.
    ///
    /// A concurrent writer shows up either as a commit conflict or, when it
    /// committed between our read and our archive insert, as a duplicate
    /// history key.
    pub(crate) fn explain(&self, error: VersionError, expected: &[(Value, u64)]) -> VersionError {
        let collision = matches!(
            &error,
            VersionError::Store(e) if e.is_conflict() || matches!(e, StoreError::DuplicateKey { .. })
        );
        if collision {
            if let Some(stale) = self.stale(expected) {
                return stale;
            }
        }
        error
    }

    /// First record whose persisted version differs from the expected one.
    fn stale(&self, expected: &[(Value, u64)]) -> Option<VersionError> {
        expected.iter().find_map(|(id, version)| {
            let found = self.current_version(id).unwrap_or(0);
            (found != *version).then(|| VersionError::conflict(id, *version, found))
        })
    }

    /// Committed version of a live record, 0 if absent.
    pub(crate) fn current_version(&self, id: &Value) -> VersionResult<u64> {
        let filter = Filter::eq(fields::ID, id.clone());
        match self.store.find_one(&self.live, &filter, &FindOptions::default(), None)? {
            Some(doc) => version_of(&doc),
            None => Ok(0),
        }
    }

    /// Runs an operation, logging its failure when `log_error` is set.
    pub(crate) fn logged<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> VersionResult<T>,
    ) -> VersionResult<T> {
        let result = f();
        if let Err(e) = &result {
            if self.config.log_error {
                tracing::error!(collection = %self.live, operation, error = %e, "versioned operation failed");
            }
        }
        result
    }
}
