//! # HistoDB Store
//!
//! In-memory transactional document store that HistoDB versions.
//!
//! This crate provides:
//! - [`Document`], a map of named [`histodb_codec::Value`] fields
//! - [`Filter`] and [`Sort`] for selecting documents
//! - [`DocumentStore`], named collections with single-document and batched
//!   writes, declared indexes and optimistic [`Session`] transactions
//!
//! Documents are stored as deterministic CBOR. Reads hand out decoded copies.
//!
//! ## Transactions
//!
//! Every operation accepts an optional session. Without one, the operation
//! commits on its own. With one, writes stay private to the session until
//! [`DocumentStore::commit`], which fails with
//! [`StoreError::TransactionConflict`] if anything the session read was
//! changed by a commit in the meantime.
//!
//! ```
//! use histodb_store::{Document, DocumentStore, Filter};
//!
//! let store = DocumentStore::new();
//! let mut session = store.begin_session();
//! store
//!     .insert_one("people", Document::new().with("_id", 1i64), Some(&mut session))
//!     .unwrap();
//! assert_eq!(store.count("people", &Filter::All, None).unwrap(), 0);
//! store.commit(&mut session).unwrap();
//! assert_eq!(store.count("people", &Filter::All, None).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod filter;
mod id;
mod index;
mod results;
mod session;
mod store;
mod types;
mod update;

pub use document::{Document, ID_FIELD};
pub use error::{StoreError, StoreResult};
pub use filter::{Filter, Sort, SortOrder};
pub use id::DocumentId;
pub use index::IndexSpec;
pub use results::{
    BulkWriteResult, DeleteResult, FindOptions, InsertManyResult, InsertOneResult, UpdateResult,
    WriteOp,
};
pub use session::{Session, SessionState};
pub use store::DocumentStore;
pub use types::{SequenceNumber, SessionId};
pub use update::Update;
