//! Error types for SmartStore
//!
//! Every fallible operation in the workspace returns [`StoreResult`]. Errors
//! are:
//! - **Structured**: each variant carries the soup, path or reason involved
//! - **Cloneable**: reasons are kept as strings so errors can cross the
//!   store queue and be compared in tests
//! - **Categorized**: [`StoreError::kind`] maps every variant onto one of the
//!   six [`ErrorKind`] categories callers dispatch on
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for SmartStore operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Broad error category.
///
/// | Kind | Raised when |
/// |------|-------------|
/// | `Schema` | index specs are empty/duplicated, or a query names an undeclared path |
/// | `NotFound` | a soup or entry is required but absent |
/// | `Conflict` | external-id resolution is ambiguous |
/// | `Translation` | smart SQL cannot be parsed or resolved |
/// | `Io` | the backend, the file system or the encryption key failed |
/// | `Validation` | caller input is malformed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Index specification problems
    Schema,
    /// Missing soup or entry
    NotFound,
    /// Ambiguous identity resolution
    Conflict,
    /// Smart SQL translation failure
    Translation,
    /// Backend / file / key failure
    Io,
    /// Malformed input
    Validation,
}

/// Error types for SmartStore
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    // ==================== Schema ====================
    /// Index spec list rejected at registration
    #[error("invalid index specs for soup '{soup}': {reason}")]
    InvalidIndexSpecs {
        /// Soup being registered
        soup: String,
        /// Why the spec list was rejected
        reason: String,
    },

    /// Path is not a declared index of the soup
    #[error("path '{path}' is not an indexed path of soup '{soup}'")]
    UnknownIndexPath {
        /// Target soup
        soup: String,
        /// Offending path
        path: String,
    },

    // ==================== Not Found ====================
    /// Soup does not exist
    #[error("soup not found: {soup}")]
    SoupNotFound {
        /// Missing soup name
        soup: String,
    },

    /// Entry id has no row in the soup
    #[error("entry {entry_id} not found in soup '{soup}'")]
    EntryNotFound {
        /// Soup searched
        soup: String,
        /// Missing entry id
        entry_id: i64,
    },

    // ==================== Conflict ====================
    /// External id matched more than one record
    #[error("duplicate external id {value} at path '{path}': {reason}")]
    DuplicateExternalId {
        /// External id path
        path: String,
        /// Rendered external id value
        value: String,
        /// Which ambiguity was detected
        reason: String,
    },

    // ==================== Translation ====================
    /// Smart SQL could not be compiled
    #[error("smart sql translation failed: {reason}")]
    Translation {
        /// Parser or resolver message
        reason: String,
    },

    // ==================== Io ====================
    /// File system error
    #[error("I/O error: {reason}")]
    Io {
        /// Underlying error message
        reason: String,
    },

    /// Backend (SQLite) error
    #[error("backend error: {reason}")]
    Backend {
        /// Underlying error message
        reason: String,
    },

    /// Payload or config could not be (de)serialized
    #[error("serialization error: {reason}")]
    Serialization {
        /// Underlying error message
        reason: String,
    },

    /// Store was opened with a key that does not match its verifier
    #[error("wrong encryption key for store '{store}'")]
    WrongKey {
        /// Store name
        store: String,
    },

    /// Store queue has been closed
    #[error("store '{store}' is closed")]
    StoreClosed {
        /// Store name
        store: String,
    },

    /// Another process holds the store lock
    #[error("store '{store}' is already in use by another process")]
    StoreLocked {
        /// Store name
        store: String,
    },

    // ==================== Validation ====================
    /// Record has no value at the external id path
    #[error("record is missing a value at external id path '{path}'")]
    MissingExternalIdValue {
        /// External id path
        path: String,
    },

    /// Invalid caller input
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },
}

impl StoreError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidIndexSpecs { .. } | StoreError::UnknownIndexPath { .. } => {
                ErrorKind::Schema
            }
            StoreError::SoupNotFound { .. } | StoreError::EntryNotFound { .. } => {
                ErrorKind::NotFound
            }
            StoreError::DuplicateExternalId { .. } => ErrorKind::Conflict,
            StoreError::Translation { .. } => ErrorKind::Translation,
            StoreError::Io { .. }
            | StoreError::Backend { .. }
            | StoreError::Serialization { .. }
            | StoreError::WrongKey { .. }
            | StoreError::StoreClosed { .. }
            | StoreError::StoreLocked { .. } => ErrorKind::Io,
            StoreError::MissingExternalIdValue { .. } | StoreError::InvalidInput { .. } => {
                ErrorKind::Validation
            }
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Invalid caller input
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        StoreError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Smart SQL translation failure
    pub fn translation(reason: impl Into<String>) -> Self {
        StoreError::Translation {
            reason: reason.into(),
        }
    }

    /// Rejected index spec list
    pub fn invalid_specs(soup: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidIndexSpecs {
            soup: soup.into(),
            reason: reason.into(),
        }
    }

    /// Path not declared on the soup
    pub fn unknown_path(soup: impl Into<String>, path: impl Into<String>) -> Self {
        StoreError::UnknownIndexPath {
            soup: soup.into(),
            path: path.into(),
        }
    }

    /// Missing soup
    pub fn soup_not_found(soup: impl Into<String>) -> Self {
        StoreError::SoupNotFound { soup: soup.into() }
    }

    /// Serialization failure
    pub fn serialization(reason: impl Into<String>) -> Self {
        StoreError::Serialization {
            reason: reason.into(),
        }
    }

    /// Backend failure not covered by `rusqlite::Error`
    pub fn backend(reason: impl Into<String>) -> Self {
        StoreError::Backend {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io {
            reason: e.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::InvalidInput {
            reason: format!("invalid config: {}", e),
        }
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(e: toml::ser::Error) -> Self {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    }
}
