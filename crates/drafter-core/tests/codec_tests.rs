//! Snapshot encoding laws and schema drift

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use drafter_core::codec::{self, Snapshot, CURRENT_SNAPSHOT_VERSION};
use drafter_core::errors::ExErrorKind;
use drafter_core::{reify_with_schema, AttributeMap, Draft, EntitySchema, OperationType};
use proptest::prelude::*;
use serde_json::{json, Value};

fn attribute_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn attribute_map() -> impl Strategy<Value = AttributeMap> {
    prop::collection::btree_map("[a-z_]{1,12}", attribute_value(), 0..8)
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(attributes in attribute_map()) {
        let schema = EntitySchema::new("anything");
        let snapshot = codec::encode_attributes("anything", &attributes, &schema);
        prop_assert_eq!(codec::decode(&snapshot), attributes.clone());

        let json = snapshot.to_json().unwrap();
        prop_assert_eq!(codec::decode_json(&json).unwrap(), attributes);
    }

    #[test]
    fn prop_stored_snapshots_verify(attributes in attribute_map()) {
        let json = Snapshot::new("anything", attributes).to_json().unwrap();
        prop_assert!(Snapshot::from_json(&json).unwrap().verify());
    }
}

#[test]
fn test_floats_survive_json_exactly() {
    let mut attributes = AttributeMap::new();
    for (i, f) in [
        1.0715660391465826e-75,
        -1.81996730402717e-179,
        -1.603964615428183e143,
        f64::MIN_POSITIVE,
        5e-324,
        0.1 + 0.2,
    ]
    .into_iter()
    .enumerate()
    {
        attributes.insert(format!("f{i}"), json!(f));
    }
    let snapshot = Snapshot::new("anything", attributes.clone());

    let stored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();

    assert_eq!(stored.attributes(), &attributes);
    assert_eq!(
        stored.get("f0").and_then(Value::as_f64),
        Some(1.0715660391465826e-75)
    );
    assert!(stored.verify());
}

#[test]
fn test_legacy_flat_snapshot_is_upcast() {
    let attributes = codec::decode_json(r#"{"before_comment":"from an old build"}"#).unwrap();
    assert_eq!(attributes.get(BEFORE_COMMENT), Some(&json!("from an old build")));
}

#[test]
fn test_newer_snapshot_version_is_reported() {
    let json = format!(
        r#"{{"format":"drafter.snapshot","version":{},"attributes":{{}}}}"#,
        CURRENT_SNAPSHOT_VERSION + 1
    );
    let err = codec::decode_json(&json).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::UnsupportedSnapshot);
}

#[test]
fn test_draft_written_under_old_schema_reifies_under_new_one() {
    let old_schema = EntitySchema::new(TALKATIVE).with_attributes([BEFORE_COMMENT, "mood"]);
    let new_schema = EntitySchema::new(TALKATIVE).with_attributes([BEFORE_COMMENT, AFTER_COMMENT]);
    let mut attributes = AttributeMap::new();
    attributes.insert(BEFORE_COMMENT.to_string(), json!("hello"));
    attributes.insert("mood".to_string(), json!("chatty"));
    let draft = Draft::new(
        "t1",
        OperationType::Create,
        1,
        codec::encode_attributes(TALKATIVE, &attributes, &old_schema),
        chrono::Utc::now(),
    );

    let reified = reify_with_schema(&draft, &new_schema);

    assert_eq!(reified.get_str(BEFORE_COMMENT), Some("hello"));
    assert_eq!(reified.get("mood"), None);
    assert_eq!(reified.get(AFTER_COMMENT), None);
}

#[test]
fn test_talkative_snapshots_capture_declared_attributes_only() {
    let manager = talkative_manager();
    let mut talkative = new_talkative().with_attribute("scratch", "not declared");

    let draft = manager.save_draft(&mut talkative).unwrap();

    assert_eq!(draft.snapshot().get("scratch"), None);
    assert_eq!(draft.snapshot().entity_type(), TALKATIVE);
    assert!(draft.snapshot().verify());
}
