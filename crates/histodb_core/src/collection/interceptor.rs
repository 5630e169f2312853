//! Archive-then-advance for single records.

use super::VersionedCollection;
use crate::error::{VersionError, VersionResult};
use crate::fields;
use crate::options::MutationOptions;
use crate::util::{history_id, id_of, validity_start, version_of, version_value};
use histodb_codec::{Timestamp, Value};
use histodb_store::{DeleteResult, Document, DocumentId, Filter, FindOptions, Session, Sort};

/// Who is recorded on an archived snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Attribution {
    Editor(String),
    Deleter(String),
}

impl VersionedCollection {
    /// Saves a record.
    ///
    /// A record without a version (or with version 0) is new: it gets
    /// version 1 and is inserted. Otherwise the persisted record is loaded,
    /// its version compared with `document`'s, and on a match it is archived
    /// to history while `document` is written to the live collection with
    /// its version advanced.
    ///
    /// A record carrying `_deleter` is archived with that deleter instead of
    /// an editor. `_editor` and `_deleter` are never persisted on the live
    /// record.
    ///
    /// `document` is updated in place only once both writes have succeeded.
    ///
    /// # Errors
    ///
    /// - [`VersionError::NotFound`] if the record is no longer live
    /// - [`VersionError::ConcurrencyConflict`] if it was changed since
    ///   `document` was read
    pub fn save(
        &self,
        document: &mut Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<()> {
        self.logged("save", || {
            let version = version_of(document)?;
            let now = self.config.clock.now();

            if version == 0 {
                let expected: Vec<_> = document.id().map(|id| (id.clone(), 0)).into_iter().collect();
                let record = document.clone();
                let fresh = self
                    .atomic(session, |s| {
                        let fresh = self.fresh(record, now, s)?;
                        self.store.insert_one(&self.live, fresh.clone(), Some(s))?;
                        Ok(fresh)
                    })
                    .map_err(|e| self.explain(e, &expected))?;
                *document = fresh;
                return Ok(());
            }

            let id = id_of(document)?.clone();
            let attribution = self.attribution_for(options, document);

            let next = document.clone();
            let saved = self
                .atomic(session, |s| {
                    let persisted = self.load_at(&id, version, s)?;
                    self.archive_and_advance(&persisted, next, attribution, now, s)
                })
                .map_err(|e| self.explain(e, &[(id.clone(), version)]))?;
            *document = saved;
            Ok(())
        })
    }

    /// Deletes a record, archiving its final state with the deleter.
    ///
    /// The persisted record (not the in-memory copy) is archived.
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save).
    pub fn remove(
        &self,
        document: &Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult> {
        self.logged("remove", || {
            let id = id_of(document)?.clone();
            let version = version_of(document)?;
            let deleter = self.deleter_for(options, Some(document));
            let now = self.config.clock.now();

            self.atomic(session, |s| {
                let persisted = self.load_at(&id, version, s)?;
                self.archive_and_remove(&persisted, deleter, now, s)?;
                Ok(DeleteResult { deleted: 1 })
            })
            .map_err(|e| self.explain(e, &[(id.clone(), version)]))
        })
    }

    /// Alias of [`remove`](Self::remove).
    pub fn delete(
        &self,
        document: &Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult> {
        self.remove(document, session, options)
    }

    /// Loads the live record and checks it is still at `version`.
    fn load_at(&self, id: &Value, version: u64, session: &mut Session) -> VersionResult<Document> {
        let persisted = self
            .store
            .find_one(
                &self.live,
                &Filter::eq(fields::ID, id.clone()),
                &FindOptions::default(),
                Some(session),
            )?
            .ok_or_else(|| VersionError::not_found(id))?;

        let found = version_of(&persisted)?;
        if found != version {
            return Err(VersionError::conflict(id, version, found));
        }
        Ok(persisted)
    }

    /// Archives `persisted` and replaces it with `next` at the next version.
    ///
    /// The live write is filtered by id and the persisted version, so a
    /// record that moved in between is reported as a conflict rather than
    /// overwritten.
    pub(crate) fn archive_and_advance(
        &self,
        persisted: &Document,
        next: Document,
        attribution: Attribution,
        now: Timestamp,
        session: &mut Session,
    ) -> VersionResult<Document> {
        let id = id_of(persisted)?.clone();
        let version = version_of(persisted)?;
        let snapshot = self.snapshot(persisted, now, attribution)?;
        let mut live = self.advanced(next, version + 1, now)?;
        live.insert(fields::ID, id.clone());

        self.store
            .insert_one(&self.config.collection, snapshot, Some(&mut *session))?;
        let result = self.store.replace_one(
            &self.live,
            &Self::at_version(&id, version),
            live.clone(),
            Some(session),
        )?;
        if result.matched == 0 {
            return Err(VersionError::conflict(&id, version, self.current_version(&id)?));
        }

        tracing::debug!(collection = %self.live, id = ?id, version = version + 1, "record archived and advanced");
        Ok(live)
    }

    /// Archives `persisted` with its deleter and removes it from the live
    /// collection. Returns the archived snapshot.
    pub(crate) fn archive_and_remove(
        &self,
        persisted: &Document,
        deleter: String,
        now: Timestamp,
        session: &mut Session,
    ) -> VersionResult<Document> {
        let id = id_of(persisted)?.clone();
        let version = version_of(persisted)?;
        let snapshot = self.snapshot(persisted, now, Attribution::Deleter(deleter))?;

        self.store
            .insert_one(&self.config.collection, snapshot.clone(), Some(&mut *session))?;
        let result =
            self.store
                .delete_one(&self.live, &Self::at_version(&id, version), Some(session))?;
        if result.deleted == 0 {
            return Err(VersionError::conflict(&id, version, self.current_version(&id)?));
        }

        tracing::debug!(collection = %self.live, id = ?id, version, "record archived and removed");
        Ok(snapshot)
    }

    /// Builds the history record for `record` as it stood until `now`.
    pub(crate) fn snapshot(
        &self,
        record: &Document,
        now: Timestamp,
        attribution: Attribution,
    ) -> VersionResult<Document> {
        let id = id_of(record)?;
        let version = version_of(record)?;
        if version == 0 {
            return Err(VersionError::invalid_document(format!(
                "record {id:?} has no persisted version to archive"
            )));
        }
        let start = validity_start(record)?;

        let mut snapshot = record.clone();
        snapshot.insert(fields::ID, history_id(id, version));
        snapshot.insert(
            fields::VALIDITY,
            Value::text_map([("start", Value::from(start)), ("end", Value::from(now))]),
        );
        snapshot.remove(fields::EDITOR);
        snapshot.remove(fields::DELETER);
        match attribution {
            Attribution::Editor(editor) => snapshot.insert(fields::EDITOR, editor),
            Attribution::Deleter(deleter) => snapshot.insert(fields::DELETER, deleter),
        };

        self.shapes.history.validate(&snapshot)?;
        Ok(snapshot)
    }

    /// Stamps `record` as the live record at `version`, valid from `now`.
    pub(crate) fn advanced(
        &self,
        mut record: Document,
        version: u64,
        now: Timestamp,
    ) -> VersionResult<Document> {
        record.insert(fields::VERSION, version_value(version));
        record.insert(fields::VALIDITY, Value::text_map([("start", Value::from(now))]));
        record.remove(fields::EDITOR);
        record.remove(fields::DELETER);
        self.shapes.live.validate(&record)?;
        Ok(record)
    }

    /// Stamps a new record at its first unused version, generating an `_id`
    /// if needed.
    ///
    /// That is version 1, unless the id was live before: a re-inserted id
    /// continues after its last archived version.
    pub(crate) fn fresh(
        &self,
        mut record: Document,
        now: Timestamp,
        session: &mut Session,
    ) -> VersionResult<Document> {
        let version = match record.id() {
            Some(id) => self.next_unused_version(id, session)?,
            None => {
                record.insert(fields::ID, DocumentId::new());
                1
            }
        };
        self.advanced(record, version, now)
    }

    fn next_unused_version(&self, id: &Value, session: &mut Session) -> VersionResult<u64> {
        let newest_first = FindOptions::sorted(Sort::descending(fields::VERSION));
        let last = self.store.find_one(
            &self.config.collection,
            &Filter::eq(fields::HISTORY_ID, id.clone()),
            &newest_first,
            Some(session),
        )?;
        match last {
            Some(archived) => Ok(version_of(&archived)? + 1),
            None => Ok(1),
        }
    }

    /// Attribution for archiving `record`: a record carrying `_deleter` is
    /// archived as deleted, anything else as edited.
    pub(crate) fn attribution_for(&self, options: &MutationOptions, record: &Document) -> Attribution {
        if record.contains_key(fields::DELETER) {
            Attribution::Deleter(self.deleter_for(options, Some(record)))
        } else {
            Attribution::Editor(self.editor_for(options, Some(record)))
        }
    }

    /// Editor for an update: the call's, else the record's, else the default.
    pub(crate) fn editor_for(&self, options: &MutationOptions, record: Option<&Document>) -> String {
        Self::identity(options.editor.as_deref(), record, fields::EDITOR)
            .unwrap_or_else(|| self.config.default_editor.clone())
    }

    /// Deleter for a deletion: the call's, else the record's, else the
    /// default.
    pub(crate) fn deleter_for(&self, options: &MutationOptions, record: Option<&Document>) -> String {
        Self::identity(options.deleter.as_deref(), record, fields::DELETER)
            .unwrap_or_else(|| self.config.default_deleter.clone())
    }

    fn identity(explicit: Option<&str>, record: Option<&Document>, field: &str) -> Option<String> {
        explicit
            .or_else(|| record.and_then(|r| r.get(field)).and_then(Value::as_text))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}
