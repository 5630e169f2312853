//! # HistoDB Testkit
//!
//! Test utilities for HistoDB.
//!
//! This crate provides:
//! - Test fixtures: versioned collections on a fresh store with a manual clock
//! - Property-based test generators using proptest
//! - Invariant checkers for archived history
//!
//! ## Usage
//!
//! ```rust,ignore
//! use histodb_testkit::prelude::*;
//!
//! #[test]
//! fn history_stays_contiguous() {
//!     let items = TestCollection::plain();
//!     // ... save and remove records
//!     check_all_histories(&items).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod invariants;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::invariants::*;
}

pub use fixtures::*;
pub use generators::*;
pub use invariants::*;
