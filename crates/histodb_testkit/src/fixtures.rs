//! Test fixtures and collection helpers.
//!
//! Every fixture runs on its own in-memory store with a [`ManualClock`], so
//! validity intervals are deterministic.

use histodb_codec::{Timestamp, Value};
use histodb_core::{
    FieldDescriptor, FieldKind, ManualClock, MutationOptions, Schema, VersionedCollection,
    VersioningConfig,
};
use histodb_store::{Document, DocumentStore, Filter, FindOptions};
use std::sync::Arc;

/// Instant of the first clock reading in every fixture.
pub const START_MILLIS: i64 = 1_000;

/// Milliseconds the fixture clock advances after each reading.
pub const STEP_MILLIS: i64 = 10;

/// Live collection name used by fixtures.
pub const LIVE: &str = "items";

/// A versioned collection on a private store.
pub struct TestCollection {
    /// The collection under test.
    pub collection: VersionedCollection,
    /// The clock stamped on every mutation.
    pub clock: Arc<ManualClock>,
}

impl TestCollection {
    /// Collection over [`sample_schema`].
    pub fn new() -> Self {
        Self::with_schema(&sample_schema())
    }

    /// Collection with an empty schema: any fields are accepted.
    pub fn plain() -> Self {
        Self::with_schema(&Schema::new())
    }

    /// Collection over `schema` with a ticking clock.
    pub fn with_schema(schema: &Schema) -> Self {
        Self::with_config(schema, VersioningConfig::default())
    }

    /// Collection over `schema` and `config`; the config's clock is replaced
    /// by the fixture clock.
    pub fn with_config(schema: &Schema, config: VersioningConfig) -> Self {
        let clock = Arc::new(ManualClock::ticking(
            Timestamp::from_millis(START_MILLIS),
            STEP_MILLIS,
        ));
        Self::on_store(Arc::new(DocumentStore::new()), schema, config, clock)
    }

    /// Collection sharing an existing store.
    pub fn on_store(
        store: Arc<DocumentStore>,
        schema: &Schema,
        config: VersioningConfig,
        clock: Arc<ManualClock>,
    ) -> Self {
        let collection = VersionedCollection::new(store, LIVE, schema, config.clock(clock.clone()))
            .expect("Failed to set up versioned collection");
        Self { collection, clock }
    }

    /// Saves `doc` with default options, panicking on failure.
    pub fn saved(&self, mut doc: Document) -> Document {
        self.collection
            .save(&mut doc, None, &MutationOptions::default())
            .expect("Failed to save document");
        doc
    }

    /// Committed live record with `_id == id`.
    pub fn live(&self, id: impl Into<Value>) -> Option<Document> {
        self.collection
            .find_one(&Filter::eq("_id", id), &FindOptions::default(), None)
            .expect("Failed to read live record")
    }

    /// Number of committed live records.
    pub fn live_count(&self) -> usize {
        self.collection
            .store()
            .count(LIVE, &Filter::All, None)
            .expect("Failed to count live records")
    }

    /// Number of committed history records across all ids.
    pub fn history_count(&self) -> usize {
        self.collection
            .store()
            .count(self.collection.history_collection(), &Filter::All, None)
            .expect("Failed to count history records")
    }

    /// Archived versions of `id`, oldest first.
    pub fn history(&self, id: impl Into<Value>) -> Vec<Document> {
        self.collection
            .history_of(&id.into(), None)
            .expect("Failed to read history")
    }
}

impl Default for TestCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCollection {
    type Target = VersionedCollection;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

/// A person record shape: required `name`, unique `email`, optional `age`
/// and `tags`.
pub fn sample_schema() -> Schema {
    Schema::new()
        .field(FieldDescriptor::new("name", FieldKind::Text).always_required())
        .field(FieldDescriptor::new("email", FieldKind::Text).unique())
        .field(FieldDescriptor::new("age", FieldKind::Integer))
        .field(FieldDescriptor::new("tags", FieldKind::Array))
}

/// A new person record matching [`sample_schema`].
pub fn person(id: &str, name: &str) -> Document {
    Document::new()
        .with("_id", id)
        .with("name", name)
        .with("email", format!("{id}@example.com"))
}

/// Instant of the `n`th fixture clock reading (0-based).
pub fn tick(n: i64) -> Timestamp {
    Timestamp::from_millis(START_MILLIS + n * STEP_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_clock_ticks_per_mutation() {
        let items = TestCollection::new();
        let mut doc = items.saved(person("p1", "Ann"));
        doc.insert("age", 30i64);
        let doc = items.saved(doc);

        assert_eq!(
            doc.get_path("_validity.start"),
            Some(&Value::Timestamp(tick(1)))
        );
        assert_eq!(items.history("p1").len(), 1);
        assert_eq!(items.live_count(), 1);
        assert_eq!(items.history_count(), 1);
    }
}
