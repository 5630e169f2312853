//! # HistoDB Core
//!
//! Temporal versioning for document collections.
//!
//! This crate provides:
//! - [`VersionedCollection`], which intercepts every mutation of a live
//!   collection and archives the prior state to a history collection
//! - Optimistic concurrency on a per-record `_version` counter
//! - Editor and deleter attribution on archived records
//! - Batched saves and deletes of pre-fetched records
//! - Lookups by version number and by point in time
//! - Schema augmentation deriving the live and history record shapes
//!
//! ## Record lifecycle
//!
//! A record is inserted at version 1 with `_validity.start` set to the
//! current time. Each update copies the persisted record to history with
//! `_id = {_id, _version}` and a closed `_validity` interval, then writes the
//! new state with the version advanced. A delete archives the final state
//! with its deleter and removes the live record.
//!
//! ```
//! use histodb_core::{MutationOptions, Schema, VersionedCollection, VersioningConfig};
//! use histodb_store::{Document, DocumentStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(DocumentStore::new());
//! let notes =
//!     VersionedCollection::new(store, "notes", &Schema::new(), VersioningConfig::default())
//!         .unwrap();
//!
//! let mut note = Document::new().with("_id", "n1").with("text", "draft");
//! notes.save(&mut note, None, &MutationOptions::default()).unwrap();
//! note.insert("text", "final");
//! notes.save(&mut note, None, &MutationOptions::new().editor("ann")).unwrap();
//!
//! let history = notes.history_of(&"n1".into(), None).unwrap();
//! assert_eq!(history.len(), 1);
//! assert_eq!(history[0].get("text"), Some(&"draft".into()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod collection;
mod config;
mod error;
pub mod fields;
mod options;
mod schema;
mod util;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::{VersionedCollection, VersionedStore};
pub use config::VersioningConfig;
pub use error::{VersionError, VersionResult};
pub use options::{MutationOptions, ReturnDocument};
pub use schema::{
    augment, check_reserved, is_writable, AugmentedSchema, FieldDescriptor, FieldKind, Schema,
};
pub use util::{history_id, parse_version};
