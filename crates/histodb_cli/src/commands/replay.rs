//! Replay command implementation.
//!
//! A script is a JSON object:
//!
//! ```json
//! {
//!   "collection": "notes",
//!   "config": { "collection": "notes_history", "logError": true },
//!   "steps": [
//!     { "op": "save", "document": { "_id": "X", "data": "a" } },
//!     { "op": "save", "document": { "_id": "X", "data": "b" }, "editor": "ann" },
//!     { "op": "findVersion", "id": "X", "version": "1" },
//!     { "op": "remove", "id": "X", "deleter": "bob" },
//!     { "op": "history", "id": "X" }
//!   ]
//! }
//! ```
//!
//! `save` merges the given fields over the live record when one exists, so
//! scripts never carry version numbers. Each step prints one JSON result.

use crate::json::{from_document, to_document, to_value};
use histodb_codec::{Timestamp, Value};
use histodb_core::{
    parse_version, MutationOptions, Schema, VersionError, VersionResult, VersionedCollection,
    VersioningConfig,
};
use histodb_store::{Document, DocumentStore, Filter, FindOptions};
use serde::Deserialize;
use serde_json::{json, Value as Json};
use std::path::Path;
use std::sync::Arc;

/// A replay script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Live collection name.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Versioning configuration.
    #[serde(default)]
    pub config: VersioningConfig,
    /// Steps to run in order.
    pub steps: Vec<Step>,
}

/// One script step.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Insert or update a record.
    Save {
        /// Fields to write; must include `_id` to update.
        document: Json,
        /// Editor identity.
        #[serde(default)]
        editor: Option<String>,
    },
    /// Delete the live record with this id.
    Remove {
        /// Record id.
        id: Json,
        /// Deleter identity.
        #[serde(default)]
        deleter: Option<String>,
    },
    /// Look a record up by version number.
    FindVersion {
        /// Record id.
        id: Json,
        /// Positive version number, as text.
        version: String,
    },
    /// Look a record up by instant.
    FindValidVersion {
        /// Record id.
        id: Json,
        /// Milliseconds since the Unix epoch.
        at: i64,
    },
    /// List the archived versions of a record.
    History {
        /// Record id.
        id: Json,
    },
}

fn default_collection() -> String {
    "records".to_string()
}

/// Runs the replay command.
pub fn run(path: &Path, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    let script: Script = serde_json::from_str(&data)?;
    tracing::info!(steps = script.steps.len(), collection = %script.collection, "replaying script");

    let store = Arc::new(DocumentStore::new());
    let collection =
        VersionedCollection::new(store, script.collection.as_str(), &Schema::new(), script.config)?;

    for (index, step) in script.steps.iter().enumerate() {
        let output = match execute(&collection, step) {
            Ok(result) => json!({ "step": index, "ok": result }),
            Err(e) => {
                tracing::debug!(step = index, error = %e, "step failed");
                json!({ "step": index, "error": e.to_string() })
            }
        };
        if pretty {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{output}");
        }
    }
    Ok(())
}

/// Runs one step and returns its JSON result.
pub fn execute(
    collection: &VersionedCollection,
    step: &Step,
) -> Result<Json, Box<dyn std::error::Error>> {
    match step {
        Step::Save { document, editor } => {
            let fields = to_document(document)?;
            let mut record = match fields.id() {
                Some(id) => live(collection, id)?.unwrap_or_default(),
                None => Document::new(),
            };
            for (field, value) in fields.iter() {
                record.insert(field, value.clone());
            }
            let mut options = MutationOptions::new();
            if let Some(editor) = editor {
                options = options.editor(editor.as_str());
            }
            collection.save(&mut record, None, &options)?;
            Ok(from_document(&record))
        }
        Step::Remove { id, deleter } => {
            let id = to_value(id)?;
            let record = live(collection, &id)?
                .ok_or_else(|| VersionError::not_found(&id))?;
            let mut options = MutationOptions::new();
            if let Some(deleter) = deleter {
                options = options.deleter(deleter.as_str());
            }
            let result = collection.remove(&record, None, &options)?;
            Ok(json!({ "deleted": result.deleted }))
        }
        Step::FindVersion { id, version } => {
            let version = parse_version(version)
                .ok_or_else(|| format!("invalid version {version:?}: expected a positive integer"))?;
            let found = collection.find_version(&to_value(id)?, version, None)?;
            Ok(found.as_ref().map_or(Json::Null, from_document))
        }
        Step::FindValidVersion { id, at } => {
            let found = collection.find_valid_version(
                &to_value(id)?,
                Timestamp::from_millis(*at),
                None,
            )?;
            Ok(found.as_ref().map_or(Json::Null, from_document))
        }
        Step::History { id } => {
            let history = collection.history_of(&to_value(id)?, None)?;
            Ok(Json::Array(history.iter().map(from_document).collect()))
        }
    }
}

fn live(collection: &VersionedCollection, id: &Value) -> VersionResult<Option<Document>> {
    collection.find_one(&Filter::eq("_id", id.clone()), &FindOptions::default(), None)
}
