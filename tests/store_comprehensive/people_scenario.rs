//! Tier 1: the "people" walkthrough on a real store file

use crate::test_utils::*;
use serde_json::json;
use smartstore::{ErrorKind, QuerySpec, SortOrder};

#[test]
fn people_end_to_end() {
    let t = TestRegistry::new();
    let store = t.store("people_store");

    store.register_soup("people", &people_specs()).unwrap();
    assert!(store.soup_exists("people").unwrap());

    let saved = store
        .upsert_entries(
            vec![person("Ann", 31), person("Bob", 25), person("Cid", 40)],
            "people",
        )
        .unwrap();
    let ids: Vec<i64> = saved.iter().map(entry_id).collect();

    // exact
    let ann = store
        .query_with_query_spec(&QuerySpec::exact("people", "name", "Ann", 10), 0)
        .unwrap();
    assert_eq!(names(&ann), vec!["Ann"]);

    // range ordered descending
    let spec = QuerySpec::range("people", "age", Some(json!(26)), Some(json!(45)), 10)
        .order_by("age", SortOrder::Descending);
    assert_eq!(names(&store.query_with_query_spec(&spec, 0).unwrap()), vec!["Cid", "Ann"]);

    // update Bob through his id
    let mut bob = saved[1].clone();
    bob["age"] = json!(26);
    store.upsert_entries(vec![bob], "people").unwrap();
    assert_eq!(
        names(&store.query_with_query_spec(&spec, 0).unwrap()),
        vec!["Cid", "Ann", "Bob"]
    );

    // smart sql over the same soup
    let smart = QuerySpec::smart(
        "SELECT {people:name}, {people:age} FROM {people} ORDER BY {people:age} DESC",
        2,
    );
    let rows = store.query_with_query_spec(&smart, 0).unwrap();
    assert_eq!(rows, vec![json!(["Cid", 40.0]), json!(["Ann", 31.0])]);
    assert_eq!(store.count_with_query_spec(&smart).unwrap(), 3);

    // cursor over everything, two per page
    let mut cursor = store
        .query_cursor(&QuerySpec::all("people", 2).order_by("name", SortOrder::Ascending), None)
        .unwrap();
    assert_eq!((cursor.total_entries, cursor.total_pages), (3, 2));
    assert_eq!(names(&cursor.current_page_entries), vec!["Ann", "Bob"]);
    store.move_cursor_to_page(&mut cursor, 1).unwrap();
    assert_eq!(names(&cursor.current_page_entries), vec!["Cid"]);

    // remove Ann
    store.remove_entries(&ids[..1], "people").unwrap();
    assert!(store.retrieve_entries(&ids[..1], "people").unwrap().is_empty());
    assert_eq!(store.retrieve_entries(&ids, "people").unwrap().len(), 2);

    // undeclared path
    let err = store
        .query_with_query_spec(&QuerySpec::exact("people", "phone", "1", 10), 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);

    // everything persists
    drop(store);
    let t = t.reopen();
    let store = t.store("people_store");
    assert_eq!(store.indices_for_soup("people").unwrap(), people_specs());
    assert_eq!(
        store.count_with_query_spec(&QuerySpec::all("people", 10)).unwrap(),
        2
    );
}

#[test]
fn query_spec_dictionary_form() {
    let t = TestRegistry::new();
    let store = t.store("dict");
    store.register_soup("people", &people_specs()).unwrap();
    store
        .upsert_entries(vec![person("Ann", 31), person("Abe", 50), person("Bob", 25)], "people")
        .unwrap();

    let spec = store
        .query_spec_from_json(&json!({
            "queryType": "like",
            "soupName": "people",
            "indexPath": "name",
            "likeKey": "A%",
            "orderPath": "age",
            "order": "descending",
            "pageSize": 5,
        }))
        .unwrap();
    assert_eq!(names(&store.query_with_query_spec(&spec, 0).unwrap()), vec!["Abe", "Ann"]);

    let cursor = store.query_cursor(&spec, None).unwrap();
    let dict = cursor.to_json();
    assert_eq!(dict["totalEntries"], 2);
    assert_eq!(dict["soupName"], "people");
}

#[test]
fn last_modified_is_queryable() {
    let t = TestRegistry::new();
    let store = t.store("lm");
    store.register_soup("people", &people_specs()).unwrap();
    let saved = store
        .upsert_entries(vec![person("Ann", 31)], "people")
        .unwrap();
    let stamp = saved[0]["_soupLastModifiedDate"].clone();

    let spec = QuerySpec::range("people", "_soupLastModifiedDate", Some(stamp.clone()), Some(stamp), 10);
    assert_eq!(store.count_with_query_spec(&spec).unwrap(), 1);
}
