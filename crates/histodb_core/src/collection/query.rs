//! Filter-based operations.
//!
//! Each operation resolves its filter against the live collection and runs
//! the single-record archive logic on what it finds, inside one session.

use super::interceptor::Attribution;
use super::VersionedCollection;
use crate::error::VersionResult;
use crate::fields;
use crate::options::{MutationOptions, ReturnDocument};
use crate::schema::is_writable;
use crate::util::{id_of, version_of};
use histodb_store::{
    BulkWriteResult, DeleteResult, Document, Filter, FindOptions, InsertManyResult,
    InsertOneResult, Session, Update, UpdateResult, WriteOp,
};

impl VersionedCollection {
    /// Inserts a new record at version 1. Nothing is archived.
    ///
    /// Any `_version` or validity the caller set is overwritten. An `_id`
    /// with archived history continues after its last archived version.
    pub fn insert_one(
        &self,
        document: Document,
        session: Option<&mut Session>,
    ) -> VersionResult<InsertOneResult> {
        self.logged("insert_one", || {
            let now = self.config.clock.now();
            self.atomic(session, |s| {
                let fresh = self.fresh(document, now, s)?;
                Ok(self.store.insert_one(&self.live, fresh, Some(s))?)
            })
        })
    }

    /// Inserts new records at version 1, all or nothing.
    pub fn insert_many(
        &self,
        documents: Vec<Document>,
        session: Option<&mut Session>,
    ) -> VersionResult<InsertManyResult> {
        self.logged("insert_many", || {
            let now = self.config.clock.now();
            self.atomic(session, |s| {
                let fresh = documents
                    .into_iter()
                    .map(|d| self.fresh(d, now, &mut *s))
                    .collect::<VersionResult<Vec<_>>>()?;
                Ok(self.store.insert_many(&self.live, fresh, Some(s))?)
            })
        })
    }

    /// Updates the first record matching `filter`, archiving its prior state.
    ///
    /// Matching nothing is not an error.
    pub fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<UpdateResult> {
        self.logged("update_one", || {
            let updated = self.modify_one(filter, update, false, session, options)?;
            Ok(Self::update_counts(usize::from(updated.is_some())))
        })
    }

    /// Replaces the first record matching `filter`.
    ///
    /// The original `_id` is kept, and the replacement can't reset the
    /// version or validity: the record advances exactly as with an update.
    pub fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<UpdateResult> {
        self.logged("replace_one", || {
            let update = Update::Replace(replacement);
            let updated = self.modify_one(filter, &update, false, session, options)?;
            Ok(Self::update_counts(usize::from(updated.is_some())))
        })
    }

    /// Updates every record matching `filter`, archiving each.
    ///
    /// `options.sort` and `options.skip` do not apply.
    pub fn update_many(
        &self,
        filter: &Filter,
        update: &Update,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<UpdateResult> {
        self.logged("update_many", || {
            let update = Self::writable(update);
            let editor = self.editor_for(options, None);
            let now = self.config.clock.now();
            let mut touched = Vec::new();

            let count = self
                .atomic(session, |s| {
                    let targets =
                        self.store
                            .find(&self.live, filter, &FindOptions::default(), Some(&mut *s))?;
                    for persisted in &targets {
                        touched.push((id_of(persisted)?.clone(), version_of(persisted)?));
                        let next = update.apply(persisted);
                        let attribution = Attribution::Editor(editor.clone());
                        self.archive_and_advance(persisted, next, attribution, now, s)?;
                    }
                    Ok(targets.len())
                })
                .map_err(|e| self.explain(e, &touched))?;
            Ok(Self::update_counts(count))
        })
    }

    /// Updates the first record matching `filter` in `options.sort` order
    /// and returns it as selected by `options.return_document`.
    pub fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        self.logged("find_one_and_update", || {
            self.modify_one(filter, update, true, session, options)
        })
    }

    /// Replaces the first record matching `filter` in `options.sort` order
    /// and returns it as selected by `options.return_document`.
    pub fn find_one_and_replace(
        &self,
        filter: &Filter,
        replacement: Document,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        self.logged("find_one_and_replace", || {
            let update = Update::Replace(replacement);
            self.modify_one(filter, &update, true, session, options)
        })
    }

    /// Deletes the first record matching `filter`, archiving it.
    pub fn delete_one(
        &self,
        filter: &Filter,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult> {
        self.logged("delete_one", || {
            let removed = self.remove_one(filter, false, session, options)?;
            Ok(DeleteResult {
                deleted: usize::from(removed.is_some()),
            })
        })
    }

    /// Deletes every record matching `filter`, archiving each.
    pub fn delete_many(
        &self,
        filter: &Filter,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<DeleteResult> {
        self.logged("delete_many", || {
            let deleter = self.deleter_for(options, None);
            let now = self.config.clock.now();
            let mut touched = Vec::new();

            let deleted = self
                .atomic(session, |s| {
                    let targets =
                        self.store
                            .find(&self.live, filter, &FindOptions::default(), Some(&mut *s))?;
                    for persisted in &targets {
                        touched.push((id_of(persisted)?.clone(), version_of(persisted)?));
                        self.archive_and_remove(persisted, deleter.clone(), now, s)?;
                    }
                    Ok(targets.len())
                })
                .map_err(|e| self.explain(e, &touched))?;
            Ok(DeleteResult { deleted })
        })
    }

    /// Deletes the first record matching `filter` in `options.sort` order
    /// and returns it as it was before deletion.
    pub fn find_one_and_delete(
        &self,
        filter: &Filter,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        self.logged("find_one_and_delete", || {
            self.remove_one(filter, true, session, options)
        })
    }

    /// Alias of [`find_one_and_delete`](Self::find_one_and_delete).
    pub fn find_one_and_remove(
        &self,
        filter: &Filter,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        self.find_one_and_delete(filter, session, options)
    }

    /// Batched writes through the interceptors, in order, in one session.
    ///
    /// Inserts get version 1; replaces, updates and deletes archive what they
    /// touch. Returns the aggregate counts.
    pub fn bulk_write(
        &self,
        ops: Vec<WriteOp>,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        self.logged("bulk_write", || {
            self.atomic(session, |s| self.apply_ops(ops, s, options))
        })
    }

    fn apply_ops(
        &self,
        ops: Vec<WriteOp>,
        s: &mut Session,
        options: &MutationOptions,
    ) -> VersionResult<BulkWriteResult> {
        let mut result = BulkWriteResult::default();
        for op in ops {
            match op {
                WriteOp::InsertOne(document) => {
                    self.insert_one(document, Some(&mut *s))?;
                    result.inserted += 1;
                }
                WriteOp::ReplaceOne {
                    filter,
                    replacement,
                } => {
                    let r = self.replace_one(&filter, replacement, Some(&mut *s), options)?;
                    result.matched += r.matched;
                    result.modified += r.modified;
                }
                WriteOp::UpdateOne { filter, update } => {
                    let r = self.update_one(&filter, &update, Some(&mut *s), options)?;
                    result.matched += r.matched;
                    result.modified += r.modified;
                }
                WriteOp::DeleteOne { filter } => {
                    result.removed += self.delete_one(&filter, Some(&mut *s), options)?.deleted;
                }
            }
        }
        Ok(result)
    }

    /// Resolves one record and archives-and-advances it.
    ///
    /// Returns the record before or after, per `options.return_document`,
    /// or `None` if nothing matched.
    fn modify_one(
        &self,
        filter: &Filter,
        update: &Update,
        honour_sort: bool,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        let update = Self::writable(update);
        let editor = self.editor_for(options, None);
        let now = self.config.clock.now();
        let lookup = self.resolution(honour_sort, options);
        let mut touched = Vec::new();

        self.atomic(session, |s| {
            let found = self.store.find_one(&self.live, filter, &lookup, Some(&mut *s))?;
            let Some(persisted) = found else {
                return Ok(None);
            };
            touched.push((id_of(&persisted)?.clone(), version_of(&persisted)?));
            let next = update.apply(&persisted);
            let updated =
                self.archive_and_advance(&persisted, next, Attribution::Editor(editor), now, s)?;
            Ok(Some(match options.return_document {
                ReturnDocument::Before => persisted,
                ReturnDocument::After => updated,
            }))
        })
        .map_err(|e| self.explain(e, &touched))
    }

    /// Resolves one record and archives-and-removes it, returning the
    /// removed live record.
    fn remove_one(
        &self,
        filter: &Filter,
        honour_sort: bool,
        session: Option<&mut Session>,
        options: &MutationOptions,
    ) -> VersionResult<Option<Document>> {
        let deleter = self.deleter_for(options, None);
        let now = self.config.clock.now();
        let lookup = self.resolution(honour_sort, options);
        let mut touched = Vec::new();

        self.atomic(session, |s| {
            let found = self.store.find_one(&self.live, filter, &lookup, Some(&mut *s))?;
            let Some(persisted) = found else {
                return Ok(None);
            };
            touched.push((id_of(&persisted)?.clone(), version_of(&persisted)?));
            self.archive_and_remove(&persisted, deleter, now, s)?;
            Ok(Some(persisted))
        })
        .map_err(|e| self.explain(e, &touched))
    }

    /// Lookup options for single-record resolution.
    fn resolution(&self, honour_sort: bool, options: &MutationOptions) -> FindOptions {
        if options.skip > 0 {
            tracing::warn!(
                collection = %self.live,
                skip = options.skip,
                "skip is ignored when resolving a single record"
            );
        }
        FindOptions {
            sort: options.sort.clone().filter(|_| honour_sort),
            skip: 0,
        }
    }

    /// Drops `_id` and reserved metadata from a caller's update.
    fn writable(update: &Update) -> Update {
        update
            .clone()
            .retain_fields(|field| field != fields::ID && is_writable(field))
    }

    fn update_counts(count: usize) -> UpdateResult {
        UpdateResult {
            matched: count,
            modified: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::VersioningConfig;
    use crate::schema::{FieldDescriptor, FieldKind, Schema};
    use histodb_codec::{Timestamp, Value};
    use histodb_store::{DocumentStore, Sort};
    use std::sync::Arc;

    fn setup() -> VersionedCollection {
        let clock = Arc::new(ManualClock::ticking(Timestamp::from_millis(0), 1));
        let schema = Schema::new()
            .field(FieldDescriptor::new("data", FieldKind::Text))
            .field(FieldDescriptor::new("rank", FieldKind::Integer));
        VersionedCollection::new(
            Arc::new(DocumentStore::new()),
            "items",
            &schema,
            VersioningConfig::default().clock(clock),
        )
        .unwrap()
    }

    fn item(id: &str, rank: i64) -> Document {
        Document::new()
            .with("_id", id)
            .with("data", "a")
            .with("rank", rank)
    }

    fn live(c: &VersionedCollection, id: &str) -> Option<Document> {
        c.find_one(&Filter::eq("_id", id), &FindOptions::default(), None)
            .unwrap()
    }

    #[test]
    fn insert_forces_version_one() {
        let c = setup();
        c.insert_one(item("x", 1).with("_version", 9i64), None).unwrap();
        assert_eq!(live(&c, "x").unwrap().get("_version"), Some(&Value::Integer(1)));
        assert!(c.history_of(&Value::from("x"), None).unwrap().is_empty());
    }

    #[test]
    fn update_one_archives() {
        let c = setup();
        c.insert_one(item("x", 1), None).unwrap();

        let r = c
            .update_one(
                &Filter::eq("_id", "x"),
                &Update::set("data", "b"),
                None,
                &MutationOptions::new().editor("ed"),
            )
            .unwrap();
        assert_eq!(r, UpdateResult { matched: 1, modified: 1 });

        let doc = live(&c, "x").unwrap();
        assert_eq!(doc.get("data"), Some(&Value::from("b")));
        assert_eq!(doc.get("_version"), Some(&Value::Integer(2)));
        let history = c.history_of(&Value::from("x"), None).unwrap();
        assert_eq!(history[0].get("_editor"), Some(&Value::from("ed")));
    }

    #[test]
    fn no_match_is_a_no_op() {
        let c = setup();
        let r = c
            .update_one(&Filter::eq("_id", "nope"), &Update::set("data", "b"), None, &MutationOptions::default())
            .unwrap();
        assert_eq!(r, UpdateResult::default());
        let d = c
            .delete_one(&Filter::eq("_id", "nope"), None, &MutationOptions::default())
            .unwrap();
        assert_eq!(d.deleted, 0);
        assert!(c
            .find_one_and_delete(&Filter::All, None, &MutationOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn update_cannot_forge_metadata() {
        let c = setup();
        c.insert_one(item("x", 1), None).unwrap();
        let update = Update::set("_version", 100i64)
            .and_set("_validity.end", Timestamp::from_millis(5))
            .and_set("_id", "other")
            .and_set("data", "b");
        c.update_one(&Filter::eq("_id", "x"), &update, None, &MutationOptions::default())
            .unwrap();

        let doc = live(&c, "x").unwrap();
        assert_eq!(doc.get("_version"), Some(&Value::Integer(2)));
        assert!(doc.get_path("_validity.end").is_none());
        assert_eq!(doc.get("data"), Some(&Value::from("b")));
    }

    #[test]
    fn replace_preserves_versioning() {
        let c = setup();
        c.insert_one(item("x", 1), None).unwrap();
        let replacement = Document::new()
            .with("data", "z")
            .with("_version", 0i64)
            .with("_id", "y");
        c.replace_one(&Filter::eq("_id", "x"), replacement, None, &MutationOptions::default())
            .unwrap();

        let doc = live(&c, "x").unwrap();
        assert_eq!(doc.get("_version"), Some(&Value::Integer(2)));
        assert_eq!(doc.get("data"), Some(&Value::from("z")));
        assert!(doc.get("rank").is_none());
        assert!(doc.get_path("_validity.start").is_some());
        assert!(live(&c, "y").is_none());
    }

    #[test]
    fn find_one_and_update_honours_sort_and_return_document() {
        let c = setup();
        c.insert_many(vec![item("a", 3), item("b", 1), item("c", 2)], None)
            .unwrap();

        let options = MutationOptions::new().sort(Sort::ascending("rank"));
        let before = c
            .find_one_and_update(&Filter::All, &Update::set("data", "b"), None, &options)
            .unwrap()
            .unwrap();
        assert_eq!(before.id(), Some(&Value::from("b")));
        assert_eq!(before.get("data"), Some(&Value::from("a")));

        let options = options.return_document(ReturnDocument::After);
        let after = c
            .find_one_and_update(&Filter::All, &Update::set("data", "c"), None, &options)
            .unwrap()
            .unwrap();
        assert_eq!(after.id(), Some(&Value::from("b")));
        assert_eq!(after.get("_version"), Some(&Value::Integer(3)));
    }

    #[test]
    fn update_one_ignores_sort_and_skip() {
        let c = setup();
        c.insert_many(vec![item("a", 3), item("b", 1)], None).unwrap();

        let options = MutationOptions::new().sort(Sort::ascending("rank")).skip(1);
        c.update_one(&Filter::All, &Update::set("data", "b"), None, &options)
            .unwrap();
        // Storage order: "a" is first.
        assert_eq!(live(&c, "a").unwrap().get("_version"), Some(&Value::Integer(2)));
        assert_eq!(live(&c, "b").unwrap().get("_version"), Some(&Value::Integer(1)));
    }

    #[test]
    fn many_operations_touch_every_match() {
        let c = setup();
        c.insert_many(vec![item("a", 1), item("b", 1), item("c", 2)], None)
            .unwrap();

        let r = c
            .update_many(&Filter::eq("rank", 1i64), &Update::set("data", "m"), None, &MutationOptions::default())
            .unwrap();
        assert_eq!(r.modified, 2);

        let d = c
            .delete_many(&Filter::All, None, &MutationOptions::new().deleter("root"))
            .unwrap();
        assert_eq!(d.deleted, 3);

        let a = c.history_of(&Value::from("a"), None).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].get("_editor"), Some(&Value::from("default")));
        assert_eq!(a[1].get("_deleter"), Some(&Value::from("root")));
        assert_eq!(c.history_of(&Value::from("c"), None).unwrap().len(), 1);
    }

    #[test]
    fn find_one_and_delete_returns_removed() {
        let c = setup();
        c.insert_one(item("x", 1), None).unwrap();
        let removed = c
            .find_one_and_remove(&Filter::eq("_id", "x"), None, &MutationOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(removed.get("_version"), Some(&Value::Integer(1)));
        assert!(live(&c, "x").is_none());
        let history = c.history_of(&Value::from("x"), None).unwrap();
        assert_eq!(history[0].get("_deleter"), Some(&Value::from("default")));
    }

    #[test]
    fn bulk_write_goes_through_interceptors() {
        let c = setup();
        c.insert_one(item("x", 1), None).unwrap();
        let result = c
            .bulk_write(
                vec![
                    WriteOp::InsertOne(item("y", 2)),
                    WriteOp::UpdateOne {
                        filter: Filter::eq("_id", "x"),
                        update: Update::set("data", "q"),
                    },
                    WriteOp::DeleteOne {
                        filter: Filter::eq("_id", "y"),
                    },
                ],
                None,
                &MutationOptions::default(),
            )
            .unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.modified, 1);
        assert_eq!(result.removed, 1);
        assert_eq!(c.history_of(&Value::from("x"), None).unwrap().len(), 1);
        assert_eq!(c.history_of(&Value::from("y"), None).unwrap().len(), 1);
    }
}
