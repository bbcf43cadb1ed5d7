//! Storage layer for SmartStore
//!
//! This crate owns everything that touches the SQLite backend directly:
//! - connection: open/create a store file, apply the key, verify it
//! - keys: key providers and the salted key verifier
//! - catalog: soup_names / soup_index_map tables and the schema cache
//! - schema: physical table layout of one soup
//! - codec: JSON <-> SQLite value conversion and index projection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod codec;
pub mod connection;
pub mod keys;
pub mod schema;

pub use catalog::Catalog;
pub use connection::{open_connection, open_in_memory, ConnectionOptions, JournalMode};
pub use keys::{default_key_provider, no_encryption, KeyCheck, KeyProvider};
pub use schema::{IndexColumn, SoupSchema, CREATED_COL, ID_COL, LAST_MODIFIED_COL, SOUP_COL};

/// Re-exported backend handle types
pub use rusqlite::{Connection, Transaction};
