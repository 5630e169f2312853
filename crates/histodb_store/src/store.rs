//! The in-memory document store.

use crate::document::{Document, ID_FIELD};
use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::id::DocumentId;
use crate::index::IndexSpec;
use crate::results::{
    BulkWriteResult, DeleteResult, FindOptions, InsertManyResult, InsertOneResult, UpdateResult,
    WriteOp,
};
use crate::session::{PendingWrite, Session};
use crate::types::{SequenceNumber, SessionId};
use crate::update::Update;
use histodb_codec::{to_cbor, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct StoredDoc {
    payload: Vec<u8>,
    seq: SequenceNumber,
}

#[derive(Debug, Default)]
struct CollectionData {
    docs: BTreeMap<Vec<u8>, StoredDoc>,
    indexes: Vec<IndexSpec>,
}

/// Matched documents keyed by storage key, with the commit sequence they
/// were read at (`None` for the session's own uncommitted writes).
type View = BTreeMap<Vec<u8>, (Option<SequenceNumber>, Document)>;

/// A transactional, in-memory document store.
///
/// Collections are created on first write. Every operation takes an optional
/// [`Session`]: with one, writes are buffered in the session and reads see
/// them; without one, the operation runs in its own session that commits
/// before the call returns.
///
/// Commits are serialized. A commit fails with
/// [`StoreError::TransactionConflict`] if any document the session read has
/// been changed (or created, or deleted) by another commit since.
pub struct DocumentStore {
    collections: RwLock<HashMap<String, CollectionData>>,
    next_session: AtomicU64,
    committed_seq: AtomicU64,
    commit_lock: Mutex<()>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            committed_seq: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }

    /// Starts a new session.
    pub fn begin_session(&self) -> Session {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::SeqCst));
        tracing::trace!(session = %id, "session started");
        Session::new(id)
    }

    /// Commits a session, making its writes visible atomically.
    ///
    /// # Errors
    ///
    /// Fails if the session is not active, if a document it read changed
    /// since it was read, if an insert collides with a committed document,
    /// or if a unique index would be violated. On failure the session is
    /// aborted and none of its writes are applied.
    pub fn commit(&self, session: &mut Session) -> StoreResult<SequenceNumber> {
        session.ensure_active()?;

        let _guard = self.commit_lock.lock();
        let mut collections = self.collections.write();

        if let Err(e) = Self::validate(&collections, session) {
            tracing::debug!(session = %session.id(), error = %e, "commit rejected");
            session.mark_aborted();
            return Err(e);
        }

        let sequence =
            SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst)).next();
        let mut writes = 0usize;
        for ((collection, key), write) in session.pending_writes() {
            let data = collections.entry(collection.clone()).or_default();
            match write {
                PendingWrite::Insert { payload } | PendingWrite::Put { payload } => {
                    data.docs.insert(
                        key.clone(),
                        StoredDoc {
                            payload: payload.clone(),
                            seq: sequence,
                        },
                    );
                }
                PendingWrite::Delete => {
                    data.docs.remove(key);
                }
            }
            writes += 1;
        }

        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
        session.mark_committed();
        tracing::debug!(session = %session.id(), %sequence, writes, "session committed");
        Ok(sequence)
    }

    /// Aborts a session, discarding its writes.
    ///
    /// # Errors
    ///
    /// Fails if the session is not active.
    pub fn abort(&self, session: &mut Session) -> StoreResult<()> {
        session.ensure_active()?;
        session.mark_aborted();
        tracing::debug!(session = %session.id(), "session aborted");
        Ok(())
    }

    /// Runs `f` in a fresh session: commits on `Ok`, aborts on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the commit error.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut session = self.begin_session();
        match f(&mut session) {
            Ok(result) => {
                self.commit(&mut session)?;
                Ok(result)
            }
            Err(e) => {
                // Don't mask the original error.
                let _ = self.abort(&mut session);
                Err(e)
            }
        }
    }

    /// Returns the sequence number of the latest commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the first document matching `filter`, in `options.sort` order
    /// (storage order if unsorted), after skipping `options.skip` matches.
    pub fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        session: Option<&mut Session>,
    ) -> StoreResult<Option<Document>> {
        let mut found = self.select(collection, filter, options, Some(1), session)?;
        Ok(found.pop().map(|(_, doc)| doc))
    }

    /// Returns every document matching `filter`.
    pub fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        session: Option<&mut Session>,
    ) -> StoreResult<Vec<Document>> {
        let found = self.select(collection, filter, options, None, session)?;
        Ok(found.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Counts documents matching `filter`.
    pub fn count(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut Session>,
    ) -> StoreResult<usize> {
        let found = self.select(collection, filter, &FindOptions::default(), None, session)?;
        Ok(found.len())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Inserts a document, generating an `_id` if it has none.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::DuplicateKey`] if the `_id` or a unique index
    /// value is already taken.
    pub fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Session>,
    ) -> StoreResult<InsertOneResult> {
        self.in_session(session, |s| self.insert_in(collection, document, s))
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// Without a caller session, a failure leaves nothing inserted.
    pub fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut Session>,
    ) -> StoreResult<InsertManyResult> {
        self.in_session(session, |s| {
            let mut result = InsertManyResult::default();
            for document in documents {
                let inserted = self.insert_in(collection, document, s)?;
                result.inserted_ids.push(inserted.inserted_id);
            }
            Ok(result)
        })
    }

    /// Replaces the first document matching `filter`. The original `_id` is
    /// kept.
    pub fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
        session: Option<&mut Session>,
    ) -> StoreResult<UpdateResult> {
        let update = Update::Replace(replacement);
        self.in_session(session, |s| self.update_in(collection, filter, &update, Some(1), s))
    }

    /// Applies `update` to the first document matching `filter`.
    pub fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        session: Option<&mut Session>,
    ) -> StoreResult<UpdateResult> {
        self.in_session(session, |s| self.update_in(collection, filter, update, Some(1), s))
    }

    /// Applies `update` to every document matching `filter`.
    pub fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        session: Option<&mut Session>,
    ) -> StoreResult<UpdateResult> {
        self.in_session(session, |s| self.update_in(collection, filter, update, None, s))
    }

    /// Deletes the first document matching `filter`.
    pub fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut Session>,
    ) -> StoreResult<DeleteResult> {
        self.in_session(session, |s| self.delete_in(collection, filter, Some(1), s))
    }

    /// Deletes every document matching `filter`.
    pub fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut Session>,
    ) -> StoreResult<DeleteResult> {
        self.in_session(session, |s| self.delete_in(collection, filter, None, s))
    }

    /// Executes write operations in order and reports aggregate counts.
    ///
    /// Operations that match nothing are counted as such, not treated as
    /// errors. The first failing operation stops the batch; without a caller
    /// session, nothing from the batch is kept.
    pub fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
        session: Option<&mut Session>,
    ) -> StoreResult<BulkWriteResult> {
        self.in_session(session, |s| {
            let mut result = BulkWriteResult::default();
            for op in ops {
                match op {
                    WriteOp::InsertOne(document) => {
                        self.insert_in(collection, document, s)?;
                        result.inserted += 1;
                    }
                    WriteOp::ReplaceOne {
                        filter,
                        replacement,
                    } => {
                        let update = Update::Replace(replacement);
                        let r = self.update_in(collection, &filter, &update, Some(1), s)?;
                        result.matched += r.matched;
                        result.modified += r.modified;
                    }
                    WriteOp::UpdateOne { filter, update } => {
                        let r = self.update_in(collection, &filter, &update, Some(1), s)?;
                        result.matched += r.matched;
                        result.modified += r.modified;
                    }
                    WriteOp::DeleteOne { filter } => {
                        result.removed += self.delete_in(collection, &filter, Some(1), s)?.deleted;
                    }
                }
            }
            tracing::trace!(collection, ?result, "bulk write applied");
            Ok(result)
        })
    }

    // ------------------------------------------------------------------
    // Indexes
    // ------------------------------------------------------------------

    /// Declares an index on a collection, creating the collection if needed.
    ///
    /// Re-declaring an identical index is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if an index with the same name but a different definition
    /// exists, or if a unique index is violated by committed documents.
    pub fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()> {
        let _guard = self.commit_lock.lock();
        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = data.indexes.iter().find(|i| i.name() == index.name()) {
            if *existing == index {
                return Ok(());
            }
            return Err(StoreError::invalid_operation(format!(
                "index {} already exists on {collection} with a different definition",
                index.name()
            )));
        }

        if index.is_unique() {
            let docs = data
                .docs
                .values()
                .map(|stored| Document::decode(&stored.payload))
                .collect::<StoreResult<Vec<_>>>()?;
            check_unique_among(collection, &index, docs.iter())?;
        }

        tracing::debug!(collection, index = index.name(), unique = index.is_unique(), "index created");
        data.indexes.push(index);
        Ok(())
    }

    /// Returns the indexes declared on a collection.
    #[must_use]
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.collections
            .read()
            .get(collection)
            .map(|data| data.indexes.clone())
            .unwrap_or_default()
    }

    /// Returns the names of all collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn in_session<T>(
        &self,
        session: Option<&mut Session>,
        f: impl FnOnce(&mut Session) -> StoreResult<T>,
    ) -> StoreResult<T> {
        match session {
            Some(session) => {
                session.ensure_active()?;
                f(session)
            }
            None => self.transaction(f),
        }
    }

    fn insert_in(
        &self,
        collection: &str,
        mut document: Document,
        session: &mut Session,
    ) -> StoreResult<InsertOneResult> {
        if document.id().is_none() {
            document.insert(ID_FIELD, DocumentId::new());
        }
        let id = document.id().cloned().unwrap_or(Value::Null);
        let key = document.key()?;

        let by_id = Filter::Eq(ID_FIELD.into(), id.clone());
        let existing = self.matching(collection, &by_id, Some(&*session))?;
        let observed = existing.get(&key).map(|(seq, _)| *seq);
        if let Some(seq) = observed {
            if let Some(seq) = seq {
                session.record_read((collection.to_string(), key), Some(seq));
            }
            return Err(StoreError::duplicate_key(collection, format!("_id {id:?}")));
        }
        session.record_read((collection.to_string(), key.clone()), None);

        self.check_unique(collection, &key, &document, session)?;
        session.insert((collection.to_string(), key), document.encode()?)?;
        Ok(InsertOneResult { inserted_id: id })
    }

    fn update_in(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        limit: Option<usize>,
        session: &mut Session,
    ) -> StoreResult<UpdateResult> {
        let targets = self.select(
            collection,
            filter,
            &FindOptions::default(),
            limit,
            Some(&mut *session),
        )?;
        let mut result = UpdateResult::default();
        for (key, original) in targets {
            result.matched += 1;
            let updated = update.apply(&original);
            if updated == original {
                continue;
            }
            self.check_unique(collection, &key, &updated, session)?;
            session.put((collection.to_string(), key), updated.encode()?)?;
            result.modified += 1;
        }
        Ok(result)
    }

    fn delete_in(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
        session: &mut Session,
    ) -> StoreResult<DeleteResult> {
        let targets = self.select(
            collection,
            filter,
            &FindOptions::default(),
            limit,
            Some(&mut *session),
        )?;
        let deleted = targets.len();
        for (key, _) in targets {
            session.delete((collection.to_string(), key))?;
        }
        Ok(DeleteResult { deleted })
    }

    /// Runs a query and records what the session observed.
    fn select(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        limit: Option<usize>,
        mut session: Option<&mut Session>,
    ) -> StoreResult<Vec<(Vec<u8>, Document)>> {
        let view = self.matching(collection, filter, session.as_deref())?;

        if let Some(session) = session.as_deref_mut() {
            if let Some(key) = key_hint(filter) {
                if !view.contains_key(&key) && session.pending(collection, &key).is_none() {
                    session.record_read((collection.to_string(), key), None);
                }
            }
            for (key, (seq, _)) in &view {
                if let Some(seq) = seq {
                    session.record_read((collection.to_string(), key.clone()), Some(*seq));
                }
            }
        }

        let mut entries: Vec<_> = view.into_iter().map(|(key, (_, doc))| (key, doc)).collect();
        if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
            entries.sort_by(|a, b| sort.compare(&a.1, &b.1));
        }
        let entries = entries.into_iter().skip(options.skip);
        Ok(match limit {
            Some(n) => entries.take(n).collect(),
            None => entries.collect(),
        })
    }

    /// Documents matching `filter` as seen by `session` (or committed state).
    fn matching(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&Session>,
    ) -> StoreResult<View> {
        let hint = key_hint(filter);
        let shadowed = |key: &[u8]| session.is_some_and(|s| s.pending(collection, key).is_some());
        let mut view = View::new();

        {
            let collections = self.collections.read();
            if let Some(data) = collections.get(collection) {
                let candidates: Box<dyn Iterator<Item = (&Vec<u8>, &StoredDoc)>> = match &hint {
                    Some(key) => Box::new(data.docs.get_key_value(key).into_iter()),
                    None => Box::new(data.docs.iter()),
                };
                for (key, stored) in candidates {
                    if shadowed(key) {
                        continue;
                    }
                    let doc = Document::decode(&stored.payload)?;
                    if filter.matches(&doc) {
                        view.insert(key.clone(), (Some(stored.seq), doc));
                    }
                }
            }
        }

        if let Some(session) = session {
            for (key, write) in session.pending_in(collection) {
                if hint.as_deref().is_some_and(|h| h != key) {
                    continue;
                }
                if let PendingWrite::Insert { payload } | PendingWrite::Put { payload } = write {
                    let doc = Document::decode(payload)?;
                    if filter.matches(&doc) {
                        view.insert(key.to_vec(), (None, doc));
                    }
                }
            }
        }

        Ok(view)
    }

    /// Write-time unique index check against the session's view.
    fn check_unique(
        &self,
        collection: &str,
        key: &[u8],
        document: &Document,
        session: &Session,
    ) -> StoreResult<()> {
        let unique: Vec<IndexSpec> = self
            .indexes(collection)
            .into_iter()
            .filter(IndexSpec::is_unique)
            .collect();
        if unique.is_empty() {
            return Ok(());
        }

        let view = self.matching(collection, &Filter::All, Some(session))?;
        for index in &unique {
            let Some(probe) = unique_key(index, document)? else {
                continue;
            };
            for (other_key, (_, other)) in &view {
                if other_key.as_slice() != key && unique_key(index, other)?.as_ref() == Some(&probe) {
                    return Err(StoreError::duplicate_key(collection, index.name()));
                }
            }
        }
        Ok(())
    }

    /// Commit-time checks, run under the commit lock.
    fn validate(
        collections: &HashMap<String, CollectionData>,
        session: &Session,
    ) -> StoreResult<()> {
        let current = |collection: &str, key: &[u8]| {
            collections
                .get(collection)
                .and_then(|data| data.docs.get(key))
                .map(|stored| stored.seq)
        };

        for ((collection, key), observed) in session.read_set() {
            if current(collection, key) != *observed {
                return Err(StoreError::TransactionConflict {
                    collection: collection.clone(),
                });
            }
        }

        let mut touched = HashSet::new();
        for ((collection, key), write) in session.pending_writes() {
            if matches!(write, PendingWrite::Insert { .. }) && current(collection, key).is_some() {
                return Err(StoreError::duplicate_key(collection.clone(), "_id"));
            }
            touched.insert(collection.as_str());
        }

        for collection in touched {
            let Some(data) = collections.get(collection) else {
                continue;
            };
            let unique: Vec<_> = data.indexes.iter().filter(|i| i.is_unique()).collect();
            if unique.is_empty() {
                continue;
            }

            let mut docs = Vec::new();
            for (key, stored) in &data.docs {
                if session.pending(collection, key).is_none() {
                    docs.push(Document::decode(&stored.payload)?);
                }
            }
            for (_, write) in session.pending_in(collection) {
                if let PendingWrite::Insert { payload } | PendingWrite::Put { payload } = write {
                    docs.push(Document::decode(payload)?);
                }
            }
            for index in unique {
                check_unique_among(collection, index, docs.iter())?;
            }
        }
        Ok(())
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("collections", &self.collections.read().len())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

/// Storage key targeted by an `_id` equality, if the filter pins one.
fn key_hint(filter: &Filter) -> Option<Vec<u8>> {
    match filter {
        Filter::Eq(path, value) if path == ID_FIELD => to_cbor(value).ok(),
        Filter::And(filters) => filters.iter().find_map(key_hint),
        _ => None,
    }
}

fn unique_key(index: &IndexSpec, doc: &Document) -> StoreResult<Option<Vec<u8>>> {
    let Some(values) = index.extract(doc) else {
        return Ok(None);
    };
    let tuple = Value::Array(
        values
            .into_iter()
            .map(|v| v.cloned().unwrap_or(Value::Null))
            .collect(),
    );
    Ok(Some(to_cbor(&tuple)?))
}

fn check_unique_among<'a>(
    collection: &str,
    index: &IndexSpec,
    docs: impl Iterator<Item = &'a Document>,
) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for doc in docs {
        if let Some(key) = unique_key(index, doc)? {
            if !seen.insert(key) {
                return Err(StoreError::duplicate_key(collection, index.name()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Sort;

    fn doc(id: i64, name: &str) -> Document {
        Document::new().with(ID_FIELD, id).with("name", name)
    }

    fn by_id(id: i64) -> Filter {
        Filter::eq(ID_FIELD, id)
    }

    #[test]
    fn insert_and_find() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();

        let found = store
            .find_one("c", &by_id(1), &FindOptions::default(), None)
            .unwrap();
        assert_eq!(found, Some(doc(1, "a")));
        assert_eq!(store.committed_seq(), SequenceNumber::new(1));
    }

    #[test]
    fn insert_generates_id() {
        let store = DocumentStore::new();
        let result = store
            .insert_one("c", Document::new().with("name", "x"), None)
            .unwrap();
        assert!(matches!(result.inserted_id, Value::Bytes(ref b) if b.len() == 16));
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();
        let err = store.insert_one("c", doc(1, "b"), None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn insert_many_is_atomic_without_session() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(2, "taken"), None).unwrap();
        let err = store
            .insert_many("c", vec![doc(1, "a"), doc(2, "b")], None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 1);
    }

    #[test]
    fn replace_keeps_id_and_counts() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();

        let r = store
            .replace_one("c", &by_id(1), Document::new().with("name", "b"), None)
            .unwrap();
        assert_eq!(r, UpdateResult { matched: 1, modified: 1 });

        let r = store
            .replace_one("c", &by_id(9), Document::new(), None)
            .unwrap();
        assert_eq!(r, UpdateResult::default());

        let found = store
            .find_one("c", &by_id(1), &FindOptions::default(), None)
            .unwrap();
        assert_eq!(found, Some(doc(1, "b")));
    }

    #[test]
    fn unchanged_replace_is_not_modified() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();
        let r = store.replace_one("c", &by_id(1), doc(1, "a"), None).unwrap();
        assert_eq!(r, UpdateResult { matched: 1, modified: 0 });
    }

    #[test]
    fn delete_one_and_many() {
        let store = DocumentStore::new();
        store
            .insert_many("c", vec![doc(1, "a"), doc(2, "a"), doc(3, "b")], None)
            .unwrap();

        assert_eq!(store.delete_one("c", &by_id(1), None).unwrap().deleted, 1);
        assert_eq!(store.delete_one("c", &by_id(1), None).unwrap().deleted, 0);
        let r = store.delete_many("c", &Filter::eq("name", "a"), None).unwrap();
        assert_eq!(r.deleted, 1);
        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 1);
    }

    #[test]
    fn find_one_honours_sort_and_skip() {
        let store = DocumentStore::new();
        store
            .insert_many("c", vec![doc(1, "b"), doc(2, "c"), doc(3, "a")], None)
            .unwrap();

        let first = store
            .find_one("c", &Filter::All, &FindOptions::sorted(Sort::ascending("name")), None)
            .unwrap();
        assert_eq!(first, Some(doc(3, "a")));

        let options = FindOptions {
            sort: Some(Sort::descending("name")),
            skip: 1,
        };
        let second = store.find_one("c", &Filter::All, &options, None).unwrap();
        assert_eq!(second, Some(doc(1, "b")));
    }

    #[test]
    fn session_writes_invisible_until_commit() {
        let store = DocumentStore::new();
        let mut session = store.begin_session();
        store.insert_one("c", doc(1, "a"), Some(&mut session)).unwrap();

        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 0);
        assert_eq!(
            store.count("c", &Filter::All, Some(&mut session)).unwrap(),
            1
        );

        store.commit(&mut session).unwrap();
        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 1);
    }

    #[test]
    fn abort_discards() {
        let store = DocumentStore::new();
        let mut session = store.begin_session();
        store.insert_one("c", doc(1, "a"), Some(&mut session)).unwrap();
        store.abort(&mut session).unwrap();
        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 0);
        assert!(store.commit(&mut session).is_err());
    }

    #[test]
    fn stale_read_conflicts_at_commit() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();

        let mut first = store.begin_session();
        let mut second = store.begin_session();
        store.replace_one("c", &by_id(1), doc(1, "x"), Some(&mut first)).unwrap();
        store.replace_one("c", &by_id(1), doc(1, "y"), Some(&mut second)).unwrap();

        store.commit(&mut first).unwrap();
        let err = store.commit(&mut second).unwrap_err();
        assert!(err.is_conflict());
        assert!(!second.is_active());

        let found = store
            .find_one("c", &by_id(1), &FindOptions::default(), None)
            .unwrap();
        assert_eq!(found, Some(doc(1, "x")));
    }

    #[test]
    fn concurrent_insert_of_same_id_conflicts() {
        let store = DocumentStore::new();
        let mut first = store.begin_session();
        let mut second = store.begin_session();
        store.insert_one("c", doc(1, "a"), Some(&mut first)).unwrap();
        store.insert_one("c", doc(1, "b"), Some(&mut second)).unwrap();

        store.commit(&mut first).unwrap();
        assert!(store.commit(&mut second).unwrap_err().is_conflict());
    }

    #[test]
    fn transaction_helper_aborts_on_error() {
        let store = DocumentStore::new();
        let result: StoreResult<()> = store.transaction(|s| {
            store.insert_one("c", doc(1, "a"), Some(s))?;
            Err(StoreError::invalid_operation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(store.count("c", &Filter::All, None).unwrap(), 0);
    }

    #[test]
    fn unique_index_enforced() {
        let store = DocumentStore::new();
        store
            .create_index("c", IndexSpec::on("name").unique(true))
            .unwrap();
        store.insert_one("c", doc(1, "a"), None).unwrap();

        let err = store.insert_one("c", doc(2, "a"), None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref detail, .. } if detail == "name_1"));

        // Updating a document to its own value is fine.
        store.replace_one("c", &by_id(1), doc(1, "a"), None).unwrap();
    }

    #[test]
    fn unique_index_checked_at_commit() {
        let store = DocumentStore::new();
        store
            .create_index("c", IndexSpec::on("name").unique(true))
            .unwrap();
        let mut first = store.begin_session();
        let mut second = store.begin_session();
        store.insert_one("c", doc(1, "a"), Some(&mut first)).unwrap();
        store.insert_one("c", doc(2, "a"), Some(&mut second)).unwrap();

        store.commit(&mut first).unwrap();
        let err = store.commit(&mut second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn create_index_is_idempotent() {
        let store = DocumentStore::new();
        let index = IndexSpec::on("name");
        store.create_index("c", index.clone()).unwrap();
        store.create_index("c", index).unwrap();
        assert_eq!(store.indexes("c").len(), 1);

        let clash = IndexSpec::on("name").unique(true);
        assert!(store.create_index("c", clash).is_err());
    }

    #[test]
    fn bulk_write_counts() {
        let store = DocumentStore::new();
        store.insert_one("c", doc(1, "a"), None).unwrap();

        let result = store
            .bulk_write(
                "c",
                vec![
                    WriteOp::InsertOne(doc(2, "b")),
                    WriteOp::ReplaceOne {
                        filter: by_id(1),
                        replacement: Document::new().with("name", "z"),
                    },
                    WriteOp::ReplaceOne {
                        filter: by_id(42),
                        replacement: Document::new(),
                    },
                    WriteOp::UpdateOne {
                        filter: by_id(2),
                        update: Update::set("name", "c"),
                    },
                    WriteOp::DeleteOne { filter: by_id(1) },
                ],
                None,
            )
            .unwrap();

        assert_eq!(
            result,
            BulkWriteResult {
                inserted: 1,
                matched: 2,
                modified: 2,
                removed: 1,
            }
        );
        assert_eq!(store.collection_names(), vec!["c".to_string()]);
    }
}
