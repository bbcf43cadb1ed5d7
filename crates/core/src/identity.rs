//! Store naming
//!
//! A store is addressed by `(name, identity)`. The identity is an opaque key
//! selecting the directory the store file lives in: one directory for the
//! shared scope, one per user id.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the default store
pub const DEFAULT_STORE_NAME: &str = "defaultStore";

/// Owner scope of a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreIdentity {
    /// Not tied to any user
    Shared,
    /// Scoped to one user id
    User(String),
}

impl StoreIdentity {
    /// Identity for `user_id`
    pub fn user(user_id: impl Into<String>) -> Self {
        StoreIdentity::User(user_id.into())
    }

    /// Directory name holding this identity's stores
    pub fn dir_name(&self) -> StoreResult<String> {
        match self {
            StoreIdentity::Shared => Ok("shared".to_string()),
            StoreIdentity::User(id) => {
                validate_component("user id", id)?;
                Ok(format!("user_{}", id))
            }
        }
    }
}

impl fmt::Display for StoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreIdentity::Shared => f.write_str("shared"),
            StoreIdentity::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Registry key of an open store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    /// Store name
    pub name: String,
    /// Owner scope
    pub identity: StoreIdentity,
}

impl StoreKey {
    /// Create a key, validating the name
    pub fn new(name: impl Into<String>, identity: StoreIdentity) -> StoreResult<Self> {
        let name = name.into();
        validate_store_name(&name)?;
        Ok(StoreKey { name, identity })
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.identity)
    }
}

/// Store names become file names: `[A-Za-z0-9_.-]`, no leading dot.
pub fn validate_store_name(name: &str) -> StoreResult<()> {
    validate_component("store name", name)
}

fn validate_component(what: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::invalid_input(format!("{} must not be empty", what)));
    }
    if value.starts_with('.') {
        return Err(StoreError::invalid_input(format!(
            "{} '{}' must not start with '.'",
            what, value
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(StoreError::invalid_input(format!(
            "{} '{}' contains invalid character {:?}",
            what, value, c
        )));
    }
    Ok(())
}
