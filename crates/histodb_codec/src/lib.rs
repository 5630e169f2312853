//! # HistoDB Codec
//!
//! Document value model and deterministic CBOR encoding for HistoDB.
//!
//! This crate provides:
//! - [`Value`], the dynamic value every document field holds
//! - [`Timestamp`], millisecond points in time used by validity intervals
//! - [`to_cbor`] / [`from_cbor`], a deterministic encoding where identical
//!   values always produce identical bytes
//!
//! ## Encoding Rules
//!
//! - Map entries are written in canonical key order (length-first)
//! - Integers use the shortest encoding
//! - Timestamps are CBOR tag 1 over an integer millisecond count
//! - Floats are rejected
//!
//! ## Usage
//!
//! ```
//! use histodb_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::text_map([("data", Value::from("a"))]);
//! let bytes = to_cbor(&value).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod timestamp;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use timestamp::Timestamp;
pub use value::Value;

/// Trait for types that can be encoded to deterministic CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
