//! SmartStore - embedded, encrypted document store
//!
//! SmartStore keeps schemaless JSON records in named collections ("soups").
//! Each soup declares the paths it indexes; records are queried by exact
//! match, range, LIKE pattern or smart SQL, and read back in pages or
//! through cursors.
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use smartstore::{IndexSpec, QuerySpec, StoreIdentity, StoreRegistry};
//!
//! # fn main() -> smartstore::StoreResult<()> {
//! let registry = StoreRegistry::open("/tmp/smartstore")?;
//! let store = registry.default_store(&StoreIdentity::Shared)?;
//!
//! store.register_soup("people", &[IndexSpec::string("name"), IndexSpec::number("age")])?;
//! store.upsert_entries(vec![json!({"name": "Ann", "age": 31})], "people")?;
//!
//! let page = store.query_with_query_spec(&QuerySpec::exact("people", "name", "Ann", 10), 0)?;
//! assert_eq!(page.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! All operations go through a [`SmartStore`] handed out by the
//! [`StoreRegistry`]. Key providers come from the storage layer; the
//! remaining internals (catalog, serial queue, query translation) stay
//! private to their crates.

pub use smartstore_core::{
    EntryId, ErrorKind, IndexSpec, IndexType, QueryKind, QuerySpec, SortOrder, StoreError,
    StoreIdentity, StoreKey, StoreResult, DEFAULT_STORE_NAME, SOUP_ENTRY_ID,
    SOUP_LAST_MODIFIED_DATE, SOUP_PAYLOAD,
};
pub use smartstore_engine::{
    ProtectionSignal, SmartStore, StoreConfig, StoreCursor, StoreRegistry, StoreRegistryBuilder,
    CONFIG_FILE_NAME,
};
pub use smartstore_storage::{default_key_provider, no_encryption, KeyProvider};
