//! Reserved field checks.

use super::Schema;
use crate::error::{VersionError, VersionResult};
use crate::fields;

/// Rejects a schema that declares any reserved metadata field.
///
/// Nested paths are checked by their root segment, so declaring
/// `_validity.start` is rejected just like `_validity`. `_id` is allowed.
///
/// # Errors
///
/// Returns [`VersionError::SchemaConflict`] naming the first reserved field.
pub fn check_reserved(schema: &Schema) -> VersionResult<()> {
    match schema
        .fields()
        .iter()
        .find(|f| fields::is_reserved(f.root()))
    {
        Some(f) => Err(VersionError::schema_conflict(f.root())),
        None => Ok(()),
    }
}

/// Returns true if callers may write this field directly.
///
/// Reserved metadata is owned by the engine.
#[must_use]
pub fn is_writable(field: &str) -> bool {
    !fields::is_reserved(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};

    #[test]
    fn accepts_plain_schema() {
        let schema = Schema::new()
            .field(FieldDescriptor::new("_id", FieldKind::Any))
            .field(FieldDescriptor::new("data", FieldKind::Text));
        assert!(check_reserved(&schema).is_ok());
    }

    #[test]
    fn rejects_every_reserved_name() {
        for name in fields::RESERVED {
            let schema = Schema::new().field(FieldDescriptor::new(name, FieldKind::Any));
            match check_reserved(&schema) {
                Err(VersionError::SchemaConflict { field }) => assert_eq!(field, name),
                other => panic!("expected conflict for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_nested_reserved_path() {
        let schema = Schema::new().field(FieldDescriptor::new("_validity.start", FieldKind::Any));
        assert!(matches!(
            check_reserved(&schema),
            Err(VersionError::SchemaConflict { field }) if field == "_validity"
        ));
    }

    #[test]
    fn writable_fields() {
        assert!(is_writable("data"));
        assert!(is_writable("_id"));
        assert!(!is_writable("_editor"));
        assert!(!is_writable("_validity.end"));
    }
}
