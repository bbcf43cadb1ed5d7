//! SmartStore: one open store file
//!
//! A [`SmartStore`] owns the backend connection behind a [`SerialQueue`].
//! Every public operation is one queued closure; writes run inside a
//! single transaction that is committed or rolled back before the closure
//! returns.
//!
//! # Example
//!
//! ```ignore
//! let store = registry.shared_store("defaultStore", &StoreIdentity::Shared)?;
//! store.register_soup("people", &[IndexSpec::string("name"), IndexSpec::number("age")])?;
//! let saved = store.upsert_entries(vec![json!({"name": "Ann", "age": 31})], "people")?;
//! let page = store.query_with_query_spec(&QuerySpec::exact("people", "name", "Ann", 10), 0)?;
//! ```

use crate::config::StoreConfig;
use crate::crud::{self, Target};
use crate::protection::ProtectionSignal;
use crate::query::{self, page_count, SmartSqlCache, StoreCursor};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::Value;
use smartstore_concurrency::{QueueStats, SerialQueue};
use smartstore_core::{
    EntryId, IndexSpec, QueryKind, QuerySpec, StoreError, StoreIdentity, StoreKey, StoreResult,
};
use smartstore_storage::{open_connection, open_in_memory, Catalog};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Session
// ============================================================================

/// State owned by the store queue
pub(crate) struct StoreSession {
    conn: Connection,
    catalog: Catalog,
    smart_sql: SmartSqlCache,
}

impl StoreSession {
    fn new(conn: Connection, smart_sql_cache_size: usize) -> StoreResult<Self> {
        Catalog::ensure_tables(&conn)?;
        Ok(StoreSession {
            conn,
            catalog: Catalog::new(),
            smart_sql: SmartSqlCache::new(smart_sql_cache_size),
        })
    }

    /// Run `f` in an immediate transaction, committing on `Ok`.
    fn transaction<R>(
        &mut self,
        f: impl FnOnce(&Transaction<'_>, &mut Catalog) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx, &mut self.catalog) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(target: "smartstore::store", error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Schema change committed: drop derived caches
    fn schema_changed(&mut self) {
        self.smart_sql.clear();
    }
}

// ============================================================================
// SmartStore
// ============================================================================

/// An open store
pub struct SmartStore {
    key: StoreKey,
    path: Option<PathBuf>,
    queue: SerialQueue<StoreSession>,
    protection: Arc<ProtectionSignal>,
    default_page_size: usize,
    lock_file: Mutex<Option<File>>,
}

impl SmartStore {
    /// Open the store file at `path`, holding `lock_file` until close.
    pub(crate) fn open(
        key: StoreKey,
        path: PathBuf,
        key_material: &str,
        config: &StoreConfig,
        protection: Arc<ProtectionSignal>,
        lock_file: File,
    ) -> StoreResult<Self> {
        let conn = open_connection(&path, &key.name, key_material, &config.connection_options()?)?;
        let session = StoreSession::new(conn, config.smart_sql_cache_size)?;
        info!(target: "smartstore::store", store = %key, path = %path.display(), "Store opened");
        Ok(SmartStore {
            queue: SerialQueue::new(key.name.clone(), session),
            key,
            path: Some(path),
            protection,
            default_page_size: config.default_page_size,
            lock_file: Mutex::new(Some(lock_file)),
        })
    }

    /// Open a private in-memory store.
    ///
    /// Nothing is persisted; useful for scratch data and tests.
    pub fn open_in_memory(name: &str, key_material: &str) -> StoreResult<Self> {
        let key = StoreKey::new(name, StoreIdentity::Shared)?;
        let config = StoreConfig::default();
        let conn = open_in_memory(name, key_material)?;
        let session = StoreSession::new(conn, config.smart_sql_cache_size)?;
        Ok(SmartStore {
            queue: SerialQueue::new(name, session),
            key,
            path: None,
            protection: Arc::new(ProtectionSignal::default()),
            default_page_size: config.default_page_size,
            lock_file: Mutex::new(None),
        })
    }

    /// Store name
    pub fn store_name(&self) -> &str {
        &self.key.name
    }

    /// Owner scope
    pub fn identity(&self) -> &StoreIdentity {
        &self.key.identity
    }

    /// Registry key
    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // Soups
    // ========================================================================

    /// Whether `soup` is registered
    pub fn soup_exists(&self, soup: &str) -> StoreResult<bool> {
        self.queue
            .run(|s| s.catalog.soup_exists(&s.conn, soup))
    }

    /// Register `soup` with its index specs.
    ///
    /// A soup that already exists is left untouched.
    #[instrument(skip_all, fields(store = %self.key, soup = %soup))]
    pub fn register_soup(&self, soup: &str, specs: &[IndexSpec]) -> StoreResult<()> {
        self.queue.run(|s| {
            let created = s.transaction(|tx, catalog| catalog.create_soup(tx, soup, specs))?;
            match created {
                Some(schema) => {
                    s.catalog.remember(schema);
                    s.schema_changed();
                    info!(target: "smartstore::store", soup, indexes = specs.len(), "Soup registered");
                }
                None => {
                    debug!(target: "smartstore::store", soup, "Soup already registered");
                }
            }
            Ok(())
        })
    }

    /// Declared index specs of `soup` in declaration order; empty if absent
    pub fn indices_for_soup(&self, soup: &str) -> StoreResult<Vec<IndexSpec>> {
        self.queue.run(|s| {
            Ok(s.catalog
                .schema(&s.conn, soup)?
                .map(|schema| schema.index_specs())
                .unwrap_or_default())
        })
    }

    /// Drop `soup` with all its entries; absent soups are ignored
    #[instrument(skip_all, fields(store = %self.key, soup = %soup))]
    pub fn remove_soup(&self, soup: &str) -> StoreResult<()> {
        self.queue.run(|s| Self::drop_soup(s, soup))
    }

    /// Drop every soup, one transaction per soup
    #[instrument(skip_all, fields(store = %self.key))]
    pub fn remove_all_soups(&self) -> StoreResult<()> {
        self.queue.run(|s| {
            for soup in Catalog::soup_names(&s.conn)? {
                Self::drop_soup(s, &soup)?;
            }
            s.catalog.clear();
            Ok(())
        })
    }

    fn drop_soup(s: &mut StoreSession, soup: &str) -> StoreResult<()> {
        let dropped = s.transaction(|tx, catalog| catalog.drop_soup(tx, soup))?;
        if dropped {
            s.catalog.forget(soup);
            s.schema_changed();
            info!(target: "smartstore::store", soup, "Soup removed");
        }
        Ok(())
    }

    /// Registered soup names, sorted
    pub fn all_soup_names(&self) -> StoreResult<Vec<String>> {
        self.queue.run(|s| Catalog::soup_names(&s.conn))
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Insert or update `entries`, matching existing rows by `_soupEntryId`.
    ///
    /// Returns the stored records with `_soupEntryId` and
    /// `_soupLastModifiedDate` set. The whole batch commits or none of it.
    #[instrument(skip_all, fields(store = %self.key, soup = %soup, count = entries.len()))]
    pub fn upsert_entries(&self, entries: Vec<Value>, soup: &str) -> StoreResult<Vec<Value>> {
        self.upsert(entries, soup, None)
    }

    /// Insert or update `entries`, matching existing rows by the value at
    /// `external_id_path`.
    ///
    /// The path must be `_soupEntryId` or a declared index path. Identity of
    /// the whole batch is resolved before anything is written.
    #[instrument(skip_all, fields(store = %self.key, soup = %soup, path = %external_id_path, count = entries.len()))]
    pub fn upsert_entries_with_external_id(
        &self,
        entries: Vec<Value>,
        soup: &str,
        external_id_path: &str,
    ) -> StoreResult<Vec<Value>> {
        self.upsert(entries, soup, Some(external_id_path))
    }

    fn upsert(
        &self,
        entries: Vec<Value>,
        soup: &str,
        external_id_path: Option<&str>,
    ) -> StoreResult<Vec<Value>> {
        self.queue.run(|s| {
            let schema = s.catalog.require(&s.conn, soup)?;
            let now = chrono::Utc::now().timestamp_millis();
            s.transaction(|tx, _| {
                let targets: Vec<Target> = match external_id_path {
                    Some(path) => crud::resolve_by_external_id(tx, &schema, &entries, path)?,
                    None => crud::resolve_by_entry_id(&entries)?,
                };
                crud::write_entries(tx, &schema, entries, &targets, now)
            })
        })
    }

    /// Stored records among `ids`, missing ids omitted
    pub fn retrieve_entries(&self, ids: &[EntryId], soup: &str) -> StoreResult<Vec<Value>> {
        self.queue.run(|s| {
            let schema = s.catalog.require(&s.conn, soup)?;
            crud::retrieve(&s.conn, &schema, ids)
        })
    }

    /// Delete `ids` from `soup`; absent ids and absent soups are ignored
    #[instrument(skip_all, fields(store = %self.key, soup = %soup, count = ids.len()))]
    pub fn remove_entries(&self, ids: &[EntryId], soup: &str) -> StoreResult<()> {
        self.queue.run(|s| {
            let Some(schema) = s.catalog.schema(&s.conn, soup)? else {
                debug!(target: "smartstore::store", soup, "Remove on absent soup ignored");
                return Ok(());
            };
            let removed = s.transaction(|tx, _| crud::delete(tx, &schema, ids))?;
            debug!(target: "smartstore::store", soup, removed, "Entries removed");
            Ok(())
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Parse a query spec from its dictionary form, using the configured
    /// default page size
    pub fn query_spec_from_json(&self, value: &Value) -> StoreResult<QuerySpec> {
        QuerySpec::from_json(value, self.default_page_size)
    }

    /// Number of records `spec` matches
    pub fn count_with_query_spec(&self, spec: &QuerySpec) -> StoreResult<usize> {
        self.queue.run(|s| {
            let plan = query::translate(spec, &s.conn, &mut s.catalog, &mut s.smart_sql)?;
            query::fetch_count(&s.conn, &plan)
        })
    }

    /// Records of page `page_index`; empty past the last page
    pub fn query_with_query_spec(
        &self,
        spec: &QuerySpec,
        page_index: usize,
    ) -> StoreResult<Vec<Value>> {
        self.queue.run(|s| {
            let plan = query::translate(spec, &s.conn, &mut s.catalog, &mut s.smart_sql)?;
            let page = query::fetch_page(&s.conn, &plan, page_index, spec.page_size)?;
            debug!(target: "smartstore::query", kind = spec.kind.name(), page_index, returned = page.len(), "Query page fetched");
            Ok(page)
        })
    }

    /// Count and first page of `spec`, taken together.
    ///
    /// `target_soup` overrides the spec's soup for non-smart queries.
    pub fn query_cursor(
        &self,
        spec: &QuerySpec,
        target_soup: Option<&str>,
    ) -> StoreResult<StoreCursor> {
        let mut spec = spec.clone();
        if let Some(soup) = target_soup {
            if !matches!(spec.kind, QueryKind::Smart { .. }) {
                spec.soup_name = Some(soup.to_string());
            }
        }
        self.queue.run(|s| {
            let plan = query::translate(&spec, &s.conn, &mut s.catalog, &mut s.smart_sql)?;
            let total = query::fetch_count(&s.conn, &plan)?;
            let first = query::fetch_page(&s.conn, &plan, 0, spec.page_size)?;
            Ok(StoreCursor::new(spec.clone(), total, first))
        })
    }

    /// Re-run the cursor's query for page `page_index`.
    ///
    /// Refreshes the totals as well. Moving past the last page is a
    /// validation error, except page 0 of an empty result.
    pub fn move_cursor_to_page(&self, cursor: &mut StoreCursor, page_index: usize) -> StoreResult<()> {
        let spec = cursor.query_spec.clone();
        let (total, entries) = self.queue.run(|s| {
            let plan = query::translate(&spec, &s.conn, &mut s.catalog, &mut s.smart_sql)?;
            let total = query::fetch_count(&s.conn, &plan)?;
            let pages = page_count(total, spec.page_size);
            if page_index >= pages && page_index != 0 {
                return Err(StoreError::invalid_input(format!(
                    "page {} is past the last page ({} pages)",
                    page_index, pages
                )));
            }
            let entries = query::fetch_page(&s.conn, &plan, page_index, spec.page_size)?;
            Ok((total, entries))
        })?;
        cursor.total_entries = total;
        cursor.total_pages = page_count(total, cursor.page_size);
        cursor.current_page_index = page_index;
        cursor.current_page_entries = entries;
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Whether platform file-level protection is known to be active
    pub fn is_file_data_protection_active(&self) -> bool {
        self.protection.is_available()
    }

    /// Queue metrics
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Wait for queued work, close the connection and release the lock file.
    ///
    /// Later operations fail with `StoreClosed`.
    pub fn close(&self) {
        if let Some(session) = self.queue.close() {
            if let Err((_, e)) = session.conn.close() {
                warn!(target: "smartstore::store", store = %self.key, error = %e, "Connection close failed");
            }
            info!(target: "smartstore::store", store = %self.key, "Store closed");
        }
        self.lock_file.lock().take();
    }
}

impl Drop for SmartStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SmartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartStore")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("queue", &self.queue)
            .finish()
    }
}
