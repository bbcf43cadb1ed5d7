//! Index specifications
//!
//! An [`IndexSpec`] declares that the value found at `path` inside every
//! record of a soup is materialized into a typed, queryable column.
//!
//! Specs serialize to the dictionary form applications register with:
//!
//! ```json
//! {"path": "address.city", "type": "string"}
//! ```

use crate::entry::{SOUP_ENTRY_ID, SOUP_LAST_MODIFIED_DATE};
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Type of an indexed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// TEXT column
    String,
    /// REAL column
    #[serde(alias = "integer", alias = "floating")]
    Number,
    /// Untyped column holding the extracted JSON value
    #[serde(alias = "json1")]
    Json,
}

impl IndexType {
    /// Catalog name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::String => "string",
            IndexType::Number => "number",
            IndexType::Json => "json",
        }
    }

    /// SQLite column declaration type
    pub fn column_decl(&self) -> &'static str {
        match self {
            IndexType::String => "TEXT",
            IndexType::Number => "REAL",
            // no declared type: the column keeps whatever storage class is bound
            IndexType::Json => "",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "string" => Ok(IndexType::String),
            "number" | "integer" | "floating" => Ok(IndexType::Number),
            "json" | "json1" => Ok(IndexType::Json),
            other => Err(StoreError::invalid_input(format!(
                "unknown index type '{}'",
                other
            ))),
        }
    }
}

/// Declaration of one indexed path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Dotted path into the record
    pub path: String,
    /// Column type
    #[serde(rename = "type")]
    pub index_type: IndexType,
}

impl IndexSpec {
    /// Create a spec
    pub fn new(path: impl Into<String>, index_type: IndexType) -> Self {
        IndexSpec {
            path: path.into(),
            index_type,
        }
    }

    /// Shorthand for a string index
    pub fn string(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::String)
    }

    /// Shorthand for a number index
    pub fn number(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::Number)
    }

    /// Shorthand for a json index
    pub fn json(path: impl Into<String>) -> Self {
        Self::new(path, IndexType::Json)
    }

    /// Parse a JSON array of `{"path", "type"}` dictionaries
    pub fn list_from_json(value: &serde_json::Value) -> StoreResult<Vec<IndexSpec>> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Check a spec list before registration.
///
/// Rejects empty lists, empty paths, reserved paths and duplicate paths.
pub fn validate_specs(soup: &str, specs: &[IndexSpec]) -> StoreResult<()> {
    if specs.is_empty() {
        return Err(StoreError::invalid_specs(
            soup,
            "at least one index spec is required",
        ));
    }

    let mut seen = HashSet::new();
    for spec in specs {
        if spec.path.trim().is_empty() {
            return Err(StoreError::invalid_specs(soup, "index path must not be empty"));
        }
        if spec.path == SOUP_ENTRY_ID || spec.path == SOUP_LAST_MODIFIED_DATE {
            return Err(StoreError::invalid_specs(
                soup,
                format!("'{}' is a reserved path", spec.path),
            ));
        }
        if !seen.insert(spec.path.as_str()) {
            return Err(StoreError::invalid_specs(
                soup,
                format!("duplicate path '{}'", spec.path),
            ));
        }
    }
    Ok(())
}
