//! Store configuration via `smartstore.toml`
//!
//! On first open a default `smartstore.toml` is written into the registry
//! root. To change settings, edit the file and reopen the registry.

use serde::{Deserialize, Serialize};
use smartstore_core::{StoreError, StoreResult};
use smartstore_storage::{ConnectionOptions, JournalMode};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the registry root.
pub const CONFIG_FILE_NAME: &str = "smartstore.toml";

/// Store configuration loaded from `smartstore.toml`.
///
/// # Example
///
/// ```toml
/// journal_mode = "wal"
/// busy_timeout_ms = 5000
/// default_page_size = 10
/// smart_sql_cache_size = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Journal mode: `"wal"` or `"delete"`.
    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,
    /// Milliseconds to wait on a locked store file.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Page size for query specs that do not name one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Cached smart SQL translations per store; 0 disables the cache.
    #[serde(default = "default_smart_sql_cache_size")]
    pub smart_sql_cache_size: usize,
}

fn default_journal_mode() -> String {
    "wal".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_page_size() -> usize {
    10
}

fn default_smart_sql_cache_size() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_mode: default_journal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            default_page_size: default_page_size(),
            smart_sql_cache_size: default_smart_sql_cache_size(),
        }
    }
}

impl StoreConfig {
    /// Parse the journal mode string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"wal"` or `"delete"`.
    pub fn journal_mode(&self) -> StoreResult<JournalMode> {
        match self.journal_mode.as_str() {
            "wal" => Ok(JournalMode::Wal),
            "delete" => Ok(JournalMode::Delete),
            other => Err(StoreError::invalid_input(format!(
                "Invalid journal_mode '{}' in {}. Expected \"wal\" or \"delete\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Check every value is usable.
    pub fn validate(&self) -> StoreResult<()> {
        self.journal_mode()?;
        if self.default_page_size == 0 {
            return Err(StoreError::invalid_input(format!(
                "default_page_size in {} must be at least 1",
                CONFIG_FILE_NAME
            )));
        }
        Ok(())
    }

    /// Backend connection settings derived from this config.
    pub fn connection_options(&self) -> StoreResult<ConnectionOptions> {
        Ok(ConnectionOptions {
            journal_mode: self.journal_mode()?,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# SmartStore configuration
#
# Journal mode: "wal" (default) or "delete"
#   "wal"    = write-ahead log, readers never block the writer
#   "delete" = classic rollback journal
journal_mode = "wal"

# How long to wait for a locked store file, in milliseconds (default: 5000)
busy_timeout_ms = 5000

# Page size used when a query spec does not set pageSize (default: 10)
default_page_size = 10

# Smart SQL translations cached per store (default: 64, 0 disables)
smart_sql_cache_size = 64
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            StoreError::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> StoreResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| StoreError::Io {
                reason: format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> StoreResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| StoreError::Io {
            reason: format!("Failed to write config file '{}': {}", path.display(), e),
        })
    }
}
