//! Schema catalog
//!
//! Persists, per soup, the ordered index spec list and the physical column
//! mapping. Catalog tables:
//!
//! ```text
//! soup_names      (id INTEGER PRIMARY KEY AUTOINCREMENT, soupName TEXT UNIQUE)
//! soup_index_map  (soupName, path, columnName, columnType, position)
//! entry_sequence  (name TEXT PRIMARY KEY, seq INTEGER)
//! ```
//!
//! Loaded schemas are cached. Write methods never touch the cache: the
//! caller runs them inside a transaction and calls [`Catalog::remember`] /
//! [`Catalog::forget`] once that transaction has committed, so a rollback
//! cannot leave the cache ahead of the file.

use crate::schema::{IndexColumn, SoupSchema};
use rusqlite::{Connection, OptionalExtension};
use smartstore_core::{validate_specs, EntryId, IndexSpec, IndexType, StoreError, StoreResult};
use std::collections::HashMap;
use tracing::{debug, instrument};

const ENTRY_SEQUENCE: &str = "entries";

/// Cached view of the catalog tables
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: HashMap<String, SoupSchema>,
}

impl Catalog {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create catalog tables if missing
    pub fn ensure_tables(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS soup_names (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                soupName TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS soup_index_map (
                soupName TEXT NOT NULL,
                path TEXT NOT NULL,
                columnName TEXT NOT NULL,
                columnType TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (soupName, path)
            );
            CREATE TABLE IF NOT EXISTS entry_sequence (
                name TEXT PRIMARY KEY,
                seq INTEGER NOT NULL
            );",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO entry_sequence (name, seq) VALUES (?1, 0)",
            rusqlite::params![ENTRY_SEQUENCE],
        )?;
        Ok(())
    }

    /// Schema of `soup`, from cache or catalog tables
    pub fn schema(&mut self, conn: &Connection, soup: &str) -> StoreResult<Option<SoupSchema>> {
        if let Some(schema) = self.schemas.get(soup) {
            return Ok(Some(schema.clone()));
        }
        let loaded = Self::load(conn, soup)?;
        if let Some(schema) = &loaded {
            self.schemas.insert(soup.to_string(), schema.clone());
        }
        Ok(loaded)
    }

    /// Schema of `soup`, or `SoupNotFound`
    pub fn require(&mut self, conn: &Connection, soup: &str) -> StoreResult<SoupSchema> {
        self.schema(conn, soup)?
            .ok_or_else(|| StoreError::soup_not_found(soup))
    }

    /// Whether `soup` has a catalog entry
    pub fn soup_exists(&mut self, conn: &Connection, soup: &str) -> StoreResult<bool> {
        Ok(self.schema(conn, soup)?.is_some())
    }

    fn load(conn: &Connection, soup: &str) -> StoreResult<Option<SoupSchema>> {
        let soup_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM soup_names WHERE soupName = ?1",
                rusqlite::params![soup],
                |row| row.get(0),
            )
            .optional()?;
        let Some(soup_id) = soup_id else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT path, columnName, columnType FROM soup_index_map
             WHERE soupName = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![soup], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = Vec::with_capacity(rows.len());
        for (path, column_name, column_type) in rows {
            columns.push(IndexColumn {
                spec: IndexSpec::new(path, column_type.parse::<IndexType>()?),
                column_name,
            });
        }

        Ok(Some(SoupSchema {
            soup_name: soup.to_string(),
            table_name: format!("TABLE_{}", soup_id),
            columns,
        }))
    }

    /// Create the soup table and catalog rows.
    ///
    /// Returns `None` when the soup already exists (nothing written).
    #[instrument(skip_all, fields(soup = %soup))]
    pub fn create_soup(
        &mut self,
        conn: &Connection,
        soup: &str,
        specs: &[IndexSpec],
    ) -> StoreResult<Option<SoupSchema>> {
        if soup.is_empty() {
            return Err(StoreError::invalid_input("soup name must not be empty"));
        }
        validate_specs(soup, specs)?;
        if self.soup_exists(conn, soup)? {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO soup_names (soupName) VALUES (?1)",
            rusqlite::params![soup],
        )?;
        let schema = SoupSchema::new(soup, conn.last_insert_rowid(), specs);

        conn.execute(&schema.create_table_sql(), [])?;
        for sql in schema.create_index_sqls() {
            conn.execute(&sql, [])?;
        }

        let mut insert = conn.prepare(
            "INSERT INTO soup_index_map (soupName, path, columnName, columnType, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, col) in schema.columns.iter().enumerate() {
            insert.execute(rusqlite::params![
                soup,
                col.spec.path,
                col.column_name,
                col.spec.index_type.as_str(),
                position as i64,
            ])?;
        }

        debug!(target: "smartstore::catalog", table = %schema.table_name, columns = schema.columns.len(), "Soup table created");
        Ok(Some(schema))
    }

    /// Drop the soup table and catalog rows.
    ///
    /// Returns `false` when the soup did not exist.
    #[instrument(skip_all, fields(soup = %soup))]
    pub fn drop_soup(&mut self, conn: &Connection, soup: &str) -> StoreResult<bool> {
        let Some(schema) = self.schema(conn, soup)? else {
            return Ok(false);
        };
        conn.execute(&schema.drop_table_sql(), [])?;
        conn.execute(
            "DELETE FROM soup_index_map WHERE soupName = ?1",
            rusqlite::params![soup],
        )?;
        conn.execute(
            "DELETE FROM soup_names WHERE soupName = ?1",
            rusqlite::params![soup],
        )?;
        debug!(target: "smartstore::catalog", table = %schema.table_name, "Soup table dropped");
        Ok(true)
    }

    /// Registered soup names, sorted
    pub fn soup_names(conn: &Connection) -> StoreResult<Vec<String>> {
        let mut stmt = conn.prepare("SELECT soupName FROM soup_names ORDER BY soupName")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Allocate the next store-wide entry identifier
    pub fn next_entry_id(conn: &Connection) -> StoreResult<EntryId> {
        Ok(conn.query_row(
            "UPDATE entry_sequence SET seq = seq + 1 WHERE name = ?1 RETURNING seq",
            rusqlite::params![ENTRY_SEQUENCE],
            |row| row.get(0),
        )?)
    }

    /// Cache a schema created by a committed transaction
    pub fn remember(&mut self, schema: SoupSchema) {
        self.schemas.insert(schema.soup_name.clone(), schema);
    }

    /// Evict a soup dropped by a committed transaction
    pub fn forget(&mut self, soup: &str) {
        self.schemas.remove(soup);
    }

    /// Evict everything
    pub fn clear(&mut self) {
        self.schemas.clear();
    }
}
