//! Core types for SmartStore
//!
//! This crate defines the foundational types used throughout the system:
//! - StoreError / ErrorKind: error hierarchy shared by every layer
//! - IndexSpec / IndexType: declarations of indexed paths
//! - path: dotted-path projection out of JSON records
//! - entry: bookkeeping fields written into soup entries
//! - QuerySpec: description of a retrieval
//! - StoreIdentity / StoreKey: addressing of stores

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod identity;
pub mod index;
pub mod path;
pub mod query;

pub use entry::{EntryId, SOUP_ENTRY_ID, SOUP_LAST_MODIFIED_DATE, SOUP_PAYLOAD};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use identity::{StoreIdentity, StoreKey, DEFAULT_STORE_NAME};
pub use index::{validate_specs, IndexSpec, IndexType};
pub use query::{QueryKind, QuerySpec, SortOrder};
