//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use histodb_core::{Schema, VersionedCollection, VersioningConfig};
use histodb_store::{Document, DocumentStore};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

/// Generate random text of the specified length.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a record with an integer id and a text payload.
pub fn record(id: i64, payload_size: usize) -> Document {
    Document::new()
        .with("_id", id)
        .with("payload", random_text(payload_size))
        .with("score", rand::thread_rng().gen_range(0..1_000i64))
}

/// Generate `count` records with ids `0..count`.
pub fn records(count: usize, payload_size: usize) -> Vec<Document> {
    (0..count as i64).map(|id| record(id, payload_size)).collect()
}

/// A versioned collection on a fresh store with the system clock.
pub fn collection() -> VersionedCollection {
    VersionedCollection::new(
        Arc::new(DocumentStore::new()),
        "bench",
        &Schema::new(),
        VersioningConfig::default(),
    )
    .expect("Failed to set up versioned collection")
}
