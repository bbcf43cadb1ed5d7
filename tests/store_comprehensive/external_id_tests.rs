//! Tier 2: external-id upserts as a sync layer would issue them

use crate::test_utils::*;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use smartstore::{ErrorKind, IndexSpec, QuerySpec, StoreError};

fn accounts(t: &TestRegistry) -> std::sync::Arc<smartstore::SmartStore> {
    let store = t.store("sync");
    store
        .register_soup(
            "accounts",
            &[
                IndexSpec::number("ServerId"),
                IndexSpec::string("Owner.Email"),
                IndexSpec::string("Name"),
            ],
        )
        .unwrap();
    store
}

fn total(store: &smartstore::SmartStore) -> usize {
    store
        .count_with_query_spec(&QuerySpec::all("accounts", 50))
        .unwrap()
}

#[test]
fn repeated_sync_is_idempotent() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    let batch = || {
        (1..=20)
            .map(|i| json!({"ServerId": i, "Name": format!("acct {}", i)}))
            .collect::<Vec<_>>()
    };

    let first = store
        .upsert_entries_with_external_id(batch(), "accounts", "ServerId")
        .unwrap();
    let second = store
        .upsert_entries_with_external_id(batch(), "accounts", "ServerId")
        .unwrap();

    assert_eq!(total(&store), 20);
    let a: Vec<i64> = first.iter().map(entry_id).collect();
    let b: Vec<i64> = second.iter().map(entry_id).collect();
    assert_eq!(a, b);
}

#[test]
fn numeric_key_matches_integer_and_float_forms() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    let saved = store
        .upsert_entries(vec![json!({"ServerId": 7, "Name": "seven"})], "accounts")
        .unwrap();

    let updated = store
        .upsert_entries_with_external_id(
            vec![json!({"ServerId": 7.0, "Name": "seven again"})],
            "accounts",
            "ServerId",
        )
        .unwrap();

    assert_eq!(entry_id(&updated[0]), entry_id(&saved[0]));
    assert_eq!(total(&store), 1);
}

#[test]
fn nested_key_path() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    store
        .upsert_entries(
            vec![json!({"Owner": {"Email": "a@x.io"}, "Name": "before"})],
            "accounts",
        )
        .unwrap();

    store
        .upsert_entries_with_external_id(
            vec![
                json!({"Owner": {"Email": "a@x.io"}, "Name": "after"}),
                json!({"Owner": {"Email": "b@x.io"}, "Name": "new"}),
            ],
            "accounts",
            "Owner.Email",
        )
        .unwrap();

    let spec = QuerySpec::all("accounts", 10).order_by("Owner.Email", smartstore::SortOrder::Ascending);
    let rows = store.query_with_query_spec(&spec, 0).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["Name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["after", "new"]);
}

#[test]
fn int_and_float_forms_of_one_key_conflict_in_batch() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    let err = store
        .upsert_entries_with_external_id(
            vec![json!({"ServerId": 7}), json!({"ServerId": 7.0})],
            "accounts",
            "ServerId",
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(total(&store), 0);

    store
        .upsert_entries_with_external_id(vec![json!({"ServerId": 7})], "accounts", "ServerId")
        .unwrap();
    assert_eq!(total(&store), 1);
}

#[test]
fn number_and_text_forms_conflict_on_string_key() {
    let t = TestRegistry::new();
    let store = t.store("codes");
    store
        .register_soup("codes", &[IndexSpec::string("Code")])
        .unwrap();
    let err = store
        .upsert_entries_with_external_id(
            vec![json!({"Code": 1}), json!({"Code": "1"})],
            "codes",
            "Code",
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        store
            .count_with_query_spec(&QuerySpec::all("codes", 10))
            .unwrap(),
        0
    );
}

#[test]
fn unparseable_number_key_is_missing_value() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    let err = store
        .upsert_entries_with_external_id(
            vec![json!({"ServerId": "not-a-number"})],
            "accounts",
            "ServerId",
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingExternalIdValue { .. }));
    assert_eq!(total(&store), 0);
}

#[test]
fn null_key_is_missing_value() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    let err = store
        .upsert_entries_with_external_id(
            vec![json!({"ServerId": null, "Name": "x"})],
            "accounts",
            "ServerId",
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingExternalIdValue { .. }));
}

#[test]
fn failed_batch_leaves_earlier_state_untouched() {
    let t = TestRegistry::new();
    let store = accounts(&t);
    store
        .upsert_entries_with_external_id(
            vec![json!({"ServerId": 1, "Name": "one"})],
            "accounts",
            "ServerId",
        )
        .unwrap();

    let err = store
        .upsert_entries_with_external_id(
            vec![
                json!({"ServerId": 1, "Name": "changed"}),
                json!({"ServerId": 2, "Name": "two"}),
                json!({"ServerId": 2, "Name": "two twice"}),
            ],
            "accounts",
            "ServerId",
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let rows = store
        .query_with_query_spec(&QuerySpec::all("accounts", 10), 0)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Name"], "one");
}

#[test]
fn external_id_on_absent_soup() {
    let t = TestRegistry::new();
    let store = t.store("empty");
    let err = store
        .upsert_entries_with_external_id(vec![json!({"k": 1})], "nothing", "k")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn key_form(key: i64, as_float: bool) -> Value {
    if as_float {
        json!(key as f64)
    } else {
        json!(key)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_batch_writes_only_with_distinct_keys(
        keys in proptest::collection::vec((0i64..6, any::<bool>()), 1..8),
    ) {
        let t = TestRegistry::new();
        let store = accounts(&t);
        let batch: Vec<Value> = keys
            .iter()
            .map(|(key, as_float)| json!({"ServerId": key_form(*key, *as_float)}))
            .collect();
        let distinct: HashSet<i64> = keys.iter().map(|(key, _)| *key).collect();

        let result = store.upsert_entries_with_external_id(batch, "accounts", "ServerId");
        if distinct.len() == keys.len() {
            prop_assert_eq!(result.unwrap().len(), keys.len());
            prop_assert_eq!(total(&store), keys.len());
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
            prop_assert_eq!(total(&store), 0);
        }
    }
}
