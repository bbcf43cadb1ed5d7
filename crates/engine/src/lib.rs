//! Store engine for SmartStore
//!
//! This crate orchestrates the lower layers:
//! - StoreRegistry: process-scoped owner of open stores, keys and lock files
//! - SmartStore: soup schema management, entry CRUD and queries on one store
//! - query: query spec translation, smart SQL compilation, cursors
//! - config: `smartstore.toml`
//!
//! The engine is the only component that knows about:
//! - Transaction scoping around schema and entry writes
//! - Cache invalidation on schema change
//! - Store file layout on disk

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod crud;
pub mod protection;
pub mod query;
pub mod registry;
pub mod store;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use protection::ProtectionSignal;
pub use query::{QueryPlan, SmartSql, StoreCursor};
pub use registry::{StoreRegistry, StoreRegistryBuilder};
pub use store::SmartStore;
