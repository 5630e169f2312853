//! Metadata field names.

/// Record identifier.
pub const ID: &str = "_id";
/// Version counter (1 for a freshly inserted record).
pub const VERSION: &str = "_version";
/// Validity interval map.
pub const VALIDITY: &str = "_validity";
/// Start of the validity interval.
pub const VALIDITY_START: &str = "_validity.start";
/// End of the validity interval (history records only).
pub const VALIDITY_END: &str = "_validity.end";
/// Who made the change that superseded a history record.
pub const EDITOR: &str = "_editor";
/// Who deleted the record a history entry was archived from.
pub const DELETER: &str = "_deleter";
/// Reserved. Sessions are passed explicitly, never stored.
pub const SESSION: &str = "_session";
/// Reserved. Deletion attribution uses [`DELETER`].
pub const DELETION: &str = "_deletion";

/// Live id inside a history record's composite `_id`.
pub const HISTORY_ID: &str = "_id._id";

/// Fields a caller schema may not declare.
pub const RESERVED: [&str; 6] = [VERSION, VALIDITY, EDITOR, DELETER, SESSION, DELETION];

/// Name of the temporal lookup index on the history collection.
pub const HISTORY_INDEX: &str = "_id_validity_start_validity_end";

/// Identity recorded when no editor or deleter is supplied.
pub const DEFAULT_IDENTITY: &str = "default";

/// Returns true if the field (or the root of a dotted path) is reserved.
#[must_use]
pub fn is_reserved(field: &str) -> bool {
    let root = field.split('.').next().unwrap_or(field);
    RESERVED.contains(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_roots() {
        assert!(is_reserved("_version"));
        assert!(is_reserved("_validity.start"));
        assert!(is_reserved("_deletion.deleter"));
        assert!(!is_reserved("_id"));
        assert!(!is_reserved("data"));
        assert!(!is_reserved("version"));
    }
}
