//! Setup-time schema checks, shape derivation and index registration.

use histodb_codec::Value;
use histodb_core::{
    augment, fields, FieldDescriptor, FieldKind, MutationOptions, Schema, VersionError,
    VersionedCollection, VersioningConfig,
};
use histodb_store::{Document, DocumentStore, SortOrder, StoreError};
use histodb_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn every_reserved_field_is_rejected() {
    for field in [
        "_version",
        "_validity",
        "_validity.start",
        "_editor",
        "_deleter",
        "_session",
        "_deletion",
    ] {
        let schema = Schema::new()
            .field(FieldDescriptor::new("name", FieldKind::Text))
            .field(FieldDescriptor::new(field, FieldKind::Any));
        let err = VersionedCollection::new(
            Arc::new(DocumentStore::new()),
            "items",
            &schema,
            VersioningConfig::default(),
        )
        .unwrap_err();
        let root = field.split('.').next().unwrap();
        assert!(
            matches!(&err, VersionError::SchemaConflict { field } if field == root),
            "{field}: {err}"
        );
        assert_eq!(err.to_string(), format!("schema can't have a path called '{root}'"));
    }
}

#[test]
fn history_shape_relaxes_caller_constraints() {
    let shapes = augment(&sample_schema());

    let live_email = shapes.live.get("email").unwrap();
    assert!(live_email.unique);
    let history_email = shapes.history.get("email").unwrap();
    assert!(!history_email.unique);
    assert_eq!(history_email.kind, FieldKind::Text);

    // `name` is always required, so it stays required on history records.
    assert!(shapes.history.get("name").unwrap().required);
    assert!(!shapes.history.get("age").unwrap().required);

    for field in [fields::VERSION, fields::VALIDITY_START, fields::VALIDITY_END] {
        assert!(shapes.history.get(field).unwrap().required, "{field}");
    }
    assert!(shapes.live.get(fields::VALIDITY_END).map_or(true, |f| !f.required));
}

#[test]
fn history_index_has_temporal_key_shape() {
    let items = TestCollection::new();
    let indexes = items.store().indexes(items.history_collection());
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name(), fields::HISTORY_INDEX);
    assert_eq!(
        indexes[0].keys(),
        &[
            ("_id._id".to_string(), SortOrder::Ascending),
            ("_validity.start".to_string(), SortOrder::Ascending),
            ("_validity.end".to_string(), SortOrder::Ascending),
        ]
    );
    assert!(!indexes[0].is_unique());
}

#[test]
fn unique_fields_bind_live_records_only() {
    let items = TestCollection::new();
    let mut ann = items.saved(person("p1", "Ann"));
    let clash = person("p2", "Bob").with("email", "p1@example.com");
    let err = items.insert_one(clash, None).unwrap_err();
    assert!(matches!(err, VersionError::Store(StoreError::DuplicateKey { .. })));

    // History keeps every archived copy of the same email.
    for age in [30i64, 31, 32] {
        ann.insert("age", age);
        ann = items.saved(ann);
    }
    assert_eq!(items.history("p1").len(), 3);
    check_all_histories(&items).unwrap();
}

#[test]
fn required_fields_are_enforced_on_save() {
    let items = TestCollection::new();
    let err = items
        .insert_one(Document::new().with("_id", "p1"), None)
        .unwrap_err();
    assert!(matches!(err, VersionError::InvalidDocument { .. }));

    let mut doc = items.saved(person("p1", "Ann"));
    doc.insert("name", Value::Null);
    let err = items
        .save(&mut doc, None, &MutationOptions::default())
        .unwrap_err();
    assert!(matches!(err, VersionError::InvalidDocument { .. }));
    assert!(items.history("p1").is_empty());
}

#[test]
fn wrong_kind_is_rejected() {
    let items = TestCollection::new();
    let doc = person("p1", "Ann").with("age", "thirty");
    assert!(matches!(
        items.insert_one(doc, None),
        Err(VersionError::InvalidDocument { .. })
    ));
}

#[test]
fn config_loads_from_json() {
    let config: VersioningConfig =
        serde_json::from_str(r#"{"collection":"audit","ensureIndex":false,"logError":true}"#)
            .unwrap();
    let items = TestCollection::with_config(&Schema::new(), config);
    assert_eq!(items.history_collection(), "audit");
    assert!(items.store().indexes("audit").is_empty());
    assert!(items.config().log_error);
}
