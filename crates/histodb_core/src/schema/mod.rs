//! Record shapes.
//!
//! A [`Schema`] is an explicit list of field descriptors, built once per
//! record shape. The versioning engine never introspects documents to learn
//! their shape: it derives the history shape by iterating this list
//! (see [`augment`]) and validates documents against it on write.

mod augment;
mod guard;

pub use augment::{augment, AugmentedSchema};
pub use guard::{check_reserved, is_writable};

use crate::error::{VersionError, VersionResult};
use histodb_codec::Value;
use histodb_store::Document;
use std::fmt;

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any value.
    Any,
    /// Boolean.
    Bool,
    /// Signed integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Byte string.
    Bytes,
    /// Millisecond timestamp.
    Timestamp,
    /// Array of values.
    Array,
    /// Nested map.
    Map,
}

impl FieldKind {
    /// Returns true if `value` is of this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Any, _)
                | (FieldKind::Bool, Value::Bool(_))
                | (FieldKind::Integer, Value::Integer(_))
                | (FieldKind::Text, Value::Text(_))
                | (FieldKind::Bytes, Value::Bytes(_))
                | (FieldKind::Timestamp, Value::Timestamp(_))
                | (FieldKind::Array, Value::Array(_))
                | (FieldKind::Map, Value::Map(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Any => "any",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Text => "text",
            FieldKind::Bytes => "bytes",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Array => "array",
            FieldKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Declaration of one field of a record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Dotted field path.
    pub path: String,
    /// Expected value kind.
    pub kind: FieldKind,
    /// Must be present (and non-null) on live records.
    pub required: bool,
    /// Values must be distinct across live records.
    pub unique: bool,
    /// Stays required on archived history records too.
    pub always_required: bool,
}

impl FieldDescriptor {
    /// Declares an optional, non-unique field.
    pub fn new(path: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            path: path.into(),
            kind,
            required: false,
            unique: false,
            always_required: false,
        }
    }

    /// Marks the field required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the field required on live and history records alike.
    #[must_use]
    pub const fn always_required(mut self) -> Self {
        self.required = true;
        self.always_required = true;
        self
    }

    /// Root segment of the path.
    #[must_use]
    pub fn root(&self) -> &str {
        self.path.split('.').next().unwrap_or(&self.path)
    }

    fn check(&self, doc: &Document) -> VersionResult<()> {
        match doc.get_path(&self.path) {
            None | Some(Value::Null) if self.required => Err(VersionError::invalid_document(
                format!("missing required field {}", self.path),
            )),
            None | Some(Value::Null) => Ok(()),
            Some(value) if self.kind.accepts(value) => Ok(()),
            Some(value) => Err(VersionError::invalid_document(format!(
                "field {} expects {}, got {}",
                self.path,
                self.kind,
                value.kind_name()
            ))),
        }
    }
}

/// An ordered list of field descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier declaration of the same path.
    #[must_use]
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.add(descriptor);
        self
    }

    /// Adds a field in place, replacing any earlier declaration of the
    /// same path.
    pub fn add(&mut self, descriptor: FieldDescriptor) {
        match self.fields.iter_mut().find(|f| f.path == descriptor.path) {
            Some(existing) => *existing = descriptor,
            None => self.fields.push(descriptor),
        }
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Checks required presence and value kinds.
    ///
    /// Undeclared fields are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidDocument`] naming the first failing
    /// field.
    pub fn validate(&self, doc: &Document) -> VersionResult<()> {
        self.fields.iter().try_for_each(|f| f.check(doc))
    }
}
