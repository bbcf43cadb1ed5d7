//! Tier 3: registry, keys and persistence across restarts

use crate::test_utils::*;
use serde_json::json;
use smartstore::{
    ErrorKind, IndexSpec, KeyProvider, QuerySpec, StoreIdentity, StoreRegistry,
    DEFAULT_STORE_NAME,
};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn soups_and_ids_survive_restart() {
    let t = TestRegistry::new();
    let store = t.store("persist");
    store.register_soup("people", &people_specs()).unwrap();
    store.register_soup("pets", &[IndexSpec::string("kind")]).unwrap();
    let saved = store
        .upsert_entries(vec![person("Ann", 31)], "people")
        .unwrap();
    drop(store);

    let t = t.reopen();
    let store = t.store("persist");
    assert_eq!(store.all_soup_names().unwrap(), vec!["people", "pets"]);
    let next = store
        .upsert_entries(vec![json!({"kind": "cat"})], "pets")
        .unwrap();
    assert!(entry_id(&next[0]) > entry_id(&saved[0]));
}

#[test]
fn removed_soup_can_be_registered_again() {
    let t = TestRegistry::new();
    let store = t.store("soups");
    store.register_soup("people", &people_specs()).unwrap();
    store
        .upsert_entries(vec![person("Ann", 31)], "people")
        .unwrap();

    store.remove_soup("people").unwrap();
    assert!(!store.soup_exists("people").unwrap());
    assert_eq!(
        store
            .count_with_query_spec(&QuerySpec::all("people", 5))
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    store
        .register_soup("people", &[IndexSpec::string("name")])
        .unwrap();
    assert_eq!(
        store.count_with_query_spec(&QuerySpec::all("people", 5)).unwrap(),
        0
    );
    assert_eq!(
        store.indices_for_soup("people").unwrap(),
        vec![IndexSpec::string("name")]
    );
}

#[test]
fn remove_all_soups_empties_the_store() {
    let t = TestRegistry::new();
    let store = t.store("wipe");
    for soup in ["a", "b", "c"] {
        store.register_soup(soup, &[IndexSpec::string("x")]).unwrap();
    }
    store.remove_all_soups().unwrap();
    assert!(store.all_soup_names().unwrap().is_empty());

    let t = t.reopen();
    assert!(t.store("wipe").all_soup_names().unwrap().is_empty());
}

#[test]
fn second_registration_keeps_first_schema() {
    let t = TestRegistry::new();
    let store = t.store("again");
    store.register_soup("people", &people_specs()).unwrap();
    store
        .register_soup("people", &[IndexSpec::number("name")])
        .unwrap();
    assert_eq!(store.indices_for_soup("people").unwrap(), people_specs());
}

#[test]
fn keyed_store_reopens_with_same_key() {
    let dir = TempDir::new().unwrap();
    let provider: KeyProvider = Arc::new(|| "k3y".to_string());
    {
        let registry = StoreRegistry::builder(dir.path())
            .key_provider(provider.clone())
            .build()
            .unwrap();
        let store = registry.default_store(&StoreIdentity::Shared).unwrap();
        store.register_soup("people", &people_specs()).unwrap();
        store
            .upsert_entries(vec![person("Ann", 31)], "people")
            .unwrap();
    }

    let registry = StoreRegistry::builder(dir.path())
        .key_provider(provider)
        .build()
        .unwrap();
    let store = registry.default_store(&StoreIdentity::Shared).unwrap();
    assert_eq!(store.store_name(), DEFAULT_STORE_NAME);
    let rows = store
        .query_with_query_spec(&QuerySpec::exact("people", "name", "Ann", 5), 0)
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn user_stores_live_under_their_own_directory() {
    let t = TestRegistry::new();
    let user = StoreIdentity::user("user-1");
    let store = t.registry.shared_store("mine", &user).unwrap();
    let path = store.path().unwrap().to_path_buf();
    assert!(path.starts_with(t.dir.path().join("user_user-1")));
    assert_eq!(store.identity(), &user);

    assert!(t
        .registry
        .all_store_names(&StoreIdentity::Shared)
        .unwrap()
        .is_empty());
    assert_eq!(t.registry.all_store_names(&user).unwrap(), vec!["mine"]);
}

#[test]
fn store_handles_outlive_removal_safely() {
    let t = TestRegistry::new();
    let store = t.store("temp");
    store.register_soup("s", &[IndexSpec::string("x")]).unwrap();
    t.registry
        .remove_shared_store("temp", &StoreIdentity::Shared)
        .unwrap();

    assert!(store.is_closed());
    let err = store.upsert_entries(vec![json!({"x": "y"})], "s").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
