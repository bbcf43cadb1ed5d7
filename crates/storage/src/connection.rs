//! Backend connection
//!
//! Opens the SQLite file backing one store, applies the encryption key and
//! connection pragmas, and checks the key against the stored verifier.
//!
//! ## Open sequence
//!
//! 1. `PRAGMA key` (must precede any other statement; no-op without SQLCipher)
//! 2. trial read of `sqlite_master` (SQLCipher rejects a wrong key here)
//! 3. journal mode and busy timeout
//! 4. `store_meta` key verifier check / creation

use crate::keys::{quote_key, KeyCheck};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use smartstore_core::{StoreError, StoreResult};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const META_KEY_SALT: &str = "key_salt";
const META_KEY_CHECK: &str = "key_check";

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Write-ahead log
    #[default]
    Wal,
    /// Rollback journal, deleted after each transaction
    Delete,
}

impl JournalMode {
    fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Journal mode
    pub journal_mode: JournalMode,
    /// How long to wait on a locked database file
    pub busy_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            journal_mode: JournalMode::Wal,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Open (or create) the store file at `path` under `key`.
#[instrument(skip_all, fields(store = %store))]
pub fn open_connection(
    path: &Path,
    store: &str,
    key: &str,
    options: &ConnectionOptions,
) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    prepare(conn, store, key, options)
}

/// Open a private in-memory store (tests, scratch stores)
pub fn open_in_memory(store: &str, key: &str) -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(conn, store, key, &ConnectionOptions::default())
}

fn prepare(
    conn: Connection,
    store: &str,
    key: &str,
    options: &ConnectionOptions,
) -> StoreResult<Connection> {
    if !key.is_empty() {
        conn.execute_batch(&format!("PRAGMA key = {};", quote_key(key)))?;
    }

    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) => StoreError::WrongKey {
            store: store.to_string(),
        },
        _ => StoreError::from(e),
    })?;

    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        options.journal_mode.as_pragma(),
        |row| row.get(0),
    )?;
    conn.busy_timeout(options.busy_timeout)?;
    debug!(target: "smartstore::storage", store, journal_mode = %mode, "Connection pragmas applied");

    verify_key(&conn, store, key)?;
    info!(target: "smartstore::storage", store, encrypted = !key.is_empty(), "Store connection opened");
    Ok(conn)
}

fn verify_key(conn: &Connection, store: &str, key: &str) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )?;

    let salt = meta_value(conn, META_KEY_SALT)?;
    let digest = meta_value(conn, META_KEY_CHECK)?;

    match (salt, digest) {
        (Some(salt), Some(digest)) => {
            let check = KeyCheck { salt, digest };
            if key.is_empty() || !check.matches(key) {
                return Err(StoreError::WrongKey {
                    store: store.to_string(),
                });
            }
        }
        _ if key.is_empty() => {}
        _ => {
            let check = KeyCheck::generate(key);
            conn.execute(
                "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2), (?3, ?4)",
                rusqlite::params![META_KEY_SALT, check.salt, META_KEY_CHECK, check.digest],
            )?;
            debug!(target: "smartstore::storage", store, "Key verifier recorded");
        }
    }
    Ok(())
}

fn meta_value(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )
        .optional()?)
}
