//! Shared helpers for the comprehensive suite

#![allow(dead_code)]

use serde_json::{json, Value};
use smartstore::{no_encryption, IndexSpec, SmartStore, StoreIdentity, StoreRegistry};
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT_LOGGING: Once = Once::new();

/// Install a fmt subscriber when `SMARTSTORE_TEST_LOG` is set
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var_os("SMARTSTORE_TEST_LOG").is_some() {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        }
    });
}

/// Registry over a fresh temp dir, without encryption
pub struct TestRegistry {
    pub dir: TempDir,
    pub registry: StoreRegistry,
}

impl TestRegistry {
    pub fn new() -> Self {
        init_logging();
        let dir = TempDir::new().unwrap();
        let registry = StoreRegistry::builder(dir.path())
            .key_provider(no_encryption())
            .build()
            .unwrap();
        TestRegistry { dir, registry }
    }

    pub fn store(&self, name: &str) -> Arc<SmartStore> {
        self.registry
            .shared_store(name, &StoreIdentity::Shared)
            .unwrap()
    }

    /// Drop the registry and open a new one over the same directory
    pub fn reopen(self) -> Self {
        let TestRegistry { dir, registry } = self;
        drop(registry);
        let registry = StoreRegistry::builder(dir.path())
            .key_provider(no_encryption())
            .build()
            .unwrap();
        TestRegistry { dir, registry }
    }
}

pub fn people_specs() -> Vec<IndexSpec> {
    vec![
        IndexSpec::string("name"),
        IndexSpec::number("age"),
        IndexSpec::string("email"),
    ]
}

pub fn person(name: &str, age: i64) -> Value {
    json!({
        "name": name,
        "age": age,
        "email": format!("{}@example.com", name.to_lowercase()),
    })
}

pub fn entry_id(entry: &Value) -> i64 {
    entry["_soupEntryId"].as_i64().unwrap()
}

pub fn names(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect()
}
