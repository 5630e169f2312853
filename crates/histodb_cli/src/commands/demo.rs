//! Demo command implementation.

use crate::json::from_document;
use histodb_codec::Value;
use histodb_core::{
    FieldDescriptor, FieldKind, MutationOptions, Schema, VersionedCollection, VersioningConfig,
};
use histodb_store::{Document, DocumentStore};
use std::sync::Arc;

/// Runs the demo command.
///
/// Inserts a record, updates it, deletes it, then prints every archived
/// version and what each lookup returns.
pub fn run(user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(DocumentStore::new());
    let schema = Schema::new().field(FieldDescriptor::new("data", FieldKind::Text).required());
    let notes = VersionedCollection::new(store, "notes", &schema, VersioningConfig::default())?;
    let options = MutationOptions::new().editor(user).deleter(user);

    let mut note = Document::new().with("_id", "X").with("data", "a");
    notes.save(&mut note, None, &options)?;
    println!("inserted  {}", from_document(&note));

    note.insert("data", "b");
    notes.save(&mut note, None, &options)?;
    println!("updated   {}", from_document(&note));

    notes.remove(&note, None, &options)?;
    println!("deleted   X");
    println!();

    let id = Value::from("X");
    println!("History of X in '{}':", notes.history_collection());
    for record in notes.history_of(&id, None)? {
        println!("  {}", from_document(&record));
    }
    println!();

    for version in 1..=3 {
        match notes.find_version(&id, version, None)? {
            Some(found) => println!("version {version}: {}", from_document(&found)),
            None => println!("version {version}: not found"),
        }
    }

    tracing::debug!(
        committed = %notes.store().committed_seq(),
        "demo finished"
    );
    Ok(())
}
