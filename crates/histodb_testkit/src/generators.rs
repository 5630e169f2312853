//! Property-based test generators using proptest.
//!
//! Provides strategies for record content and for sequences of versioned
//! mutations over a small set of ids.

use histodb_codec::{Timestamp, Value};
use histodb_store::Document;
use proptest::prelude::*;

/// Strategy for user field names (never reserved, never `_id`).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,7}").expect("Invalid regex")
}

/// Strategy for scalar field values. Floats are never produced.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[ -~]{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        (0i64..4_102_444_800_000).prop_map(|ms| Value::Timestamp(Timestamp::from_millis(ms))),
    ]
}

/// Strategy for field values: scalars and shallow arrays of scalars.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => scalar_value_strategy(),
        1 => prop::collection::vec(scalar_value_strategy(), 0..4).prop_map(Value::Array),
    ]
}

/// Strategy for record content without `_id` or versioning metadata.
pub fn content_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), field_value_strategy(), 0..6).prop_map(
        |fields| {
            fields
                .into_iter()
                .fold(Document::new(), |doc, (name, value)| doc.with(name, value))
        },
    )
}

/// Strategy for an optional editor or deleter name.
pub fn identity_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"))
}

/// One step of a random mutation sequence.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert the record if it has never existed, otherwise save new
    /// content over its current version.
    Save {
        /// Record slot.
        id: u8,
        /// Content to write.
        content: Document,
        /// Editor passed in the options.
        editor: Option<String>,
    },
    /// Delete the record if it is live.
    Remove {
        /// Record slot.
        id: u8,
        /// Deleter passed in the options.
        deleter: Option<String>,
    },
    /// Save a copy one version behind the current one, which must conflict.
    Stale {
        /// Record slot.
        id: u8,
    },
}

impl Mutation {
    /// Record slot this step touches.
    pub fn id(&self) -> u8 {
        match self {
            Mutation::Save { id, .. } | Mutation::Remove { id, .. } | Mutation::Stale { id } => *id,
        }
    }
}

/// Strategy for a single mutation over ids `0..slots`.
pub fn mutation_strategy(slots: u8) -> impl Strategy<Value = Mutation> {
    prop_oneof![
        6 => (0..slots, content_strategy(), identity_strategy())
            .prop_map(|(id, content, editor)| Mutation::Save { id, content, editor }),
        2 => (0..slots, identity_strategy()).prop_map(|(id, deleter)| Mutation::Remove { id, deleter }),
        1 => (0..slots).prop_map(|id| Mutation::Stale { id }),
    ]
}

/// Strategy for mutation sequences of up to `max_len` steps.
pub fn mutations_strategy(slots: u8, max_len: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(slots), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use histodb_core::is_writable;

    proptest! {
        #[test]
        fn content_never_carries_metadata(doc in content_strategy()) {
            for (field, _) in doc.iter() {
                prop_assert!(is_writable(field));
            }
        }

        #[test]
        fn mutations_stay_in_range(steps in mutations_strategy(4, 20)) {
            prop_assert!(steps.iter().all(|m| m.id() < 4));
        }
    }
}
