//! Live and history shapes derived from a caller schema.

use super::{FieldDescriptor, FieldKind, Schema};
use crate::fields;
use histodb_store::{IndexSpec, SortOrder};

/// The shapes and indexes a versioned collection is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedSchema {
    /// Caller fields plus live metadata.
    pub live: Schema,
    /// Caller fields (relaxed) plus history metadata.
    pub history: Schema,
    /// Temporal lookup index for the history collection.
    pub history_index: IndexSpec,
    /// Unique indexes for the live collection, one per unique caller field.
    pub live_indexes: Vec<IndexSpec>,
}

/// Derives the live and history shapes from a caller schema.
///
/// The history shape copies every caller field except `_id` with uniqueness
/// dropped and `required` reduced to `always_required`, since a snapshot
/// must be storable even when older records predate a constraint.
///
/// Callers run [`check_reserved`](super::check_reserved) first; metadata
/// fields added here replace any same-named caller declaration.
#[must_use]
pub fn augment(schema: &Schema) -> AugmentedSchema {
    let mut live = schema.clone();
    let mut history = Schema::new();
    let mut live_indexes = Vec::new();

    for field in schema.fields() {
        if field.unique {
            live_indexes.push(IndexSpec::on(field.path.clone()).unique(true));
        }
        if field.path == fields::ID {
            continue;
        }
        history.add(FieldDescriptor {
            unique: false,
            required: field.always_required,
            ..field.clone()
        });
    }

    live.add(FieldDescriptor::new(fields::VERSION, FieldKind::Integer).required());
    live.add(FieldDescriptor::new(fields::VALIDITY_START, FieldKind::Timestamp).required());
    live.add(FieldDescriptor::new(fields::VALIDITY_END, FieldKind::Timestamp));
    live.add(FieldDescriptor::new(fields::EDITOR, FieldKind::Text));
    live.add(FieldDescriptor::new(fields::DELETER, FieldKind::Text));

    history.add(FieldDescriptor::new(fields::ID, FieldKind::Map).required());
    history.add(FieldDescriptor::new(fields::VERSION, FieldKind::Integer).required());
    history.add(FieldDescriptor::new(fields::VALIDITY_START, FieldKind::Timestamp).required());
    history.add(FieldDescriptor::new(fields::VALIDITY_END, FieldKind::Timestamp).required());
    history.add(FieldDescriptor::new(fields::EDITOR, FieldKind::Text));
    history.add(FieldDescriptor::new(fields::DELETER, FieldKind::Text));

    let history_index = IndexSpec::new(
        fields::HISTORY_INDEX,
        vec![
            (fields::HISTORY_ID.to_string(), SortOrder::Ascending),
            (fields::VALIDITY_START.to_string(), SortOrder::Ascending),
            (fields::VALIDITY_END.to_string(), SortOrder::Ascending),
        ],
    );

    AugmentedSchema {
        live,
        history,
        history_index,
        live_indexes,
    }
}
