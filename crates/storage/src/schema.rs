//! Physical soup schema
//!
//! A [`SoupSchema`] describes the table backing one soup:
//!
//! | Column | Content |
//! |--------|---------|
//! | `id` | entry identifier (`INTEGER PRIMARY KEY`) |
//! | `soup` | JSON payload |
//! | `created` | epoch millis of first insert |
//! | `lastModified` | epoch millis of last upsert |
//! | `TABLE_<n>_<i>` | projection of the i-th index spec |
//!
//! Tables are named `TABLE_<n>` where `n` is the soup's row id in
//! `soup_names`, so soup names never appear in generated SQL.

use smartstore_core::{IndexSpec, IndexType, SOUP_ENTRY_ID, SOUP_LAST_MODIFIED_DATE, SOUP_PAYLOAD};

/// Entry identifier column
pub const ID_COL: &str = "id";
/// Payload column
pub const SOUP_COL: &str = "soup";
/// Creation time column
pub const CREATED_COL: &str = "created";
/// Modification time column
pub const LAST_MODIFIED_COL: &str = "lastModified";

/// One index spec and the column it is materialized into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Declared spec
    pub spec: IndexSpec,
    /// Physical column name
    pub column_name: String,
}

/// Layout of one soup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoupSchema {
    /// Logical soup name
    pub soup_name: String,
    /// Physical table name
    pub table_name: String,
    /// Indexed columns in declaration order
    pub columns: Vec<IndexColumn>,
}

impl SoupSchema {
    /// Lay out a new soup table for `soup_id`
    pub fn new(soup_name: impl Into<String>, soup_id: i64, specs: &[IndexSpec]) -> Self {
        let table_name = format!("TABLE_{}", soup_id);
        let columns = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| IndexColumn {
                spec: spec.clone(),
                column_name: format!("{}_{}", table_name, i),
            })
            .collect();
        SoupSchema {
            soup_name: soup_name.into(),
            table_name,
            columns,
        }
    }

    /// Declared specs in order
    pub fn index_specs(&self) -> Vec<IndexSpec> {
        self.columns.iter().map(|c| c.spec.clone()).collect()
    }

    /// Physical column for a query path.
    ///
    /// Resolves declared index paths plus `_soupEntryId` and
    /// `_soupLastModifiedDate`.
    pub fn column_for_path(&self, path: &str) -> Option<&str> {
        match path {
            SOUP_ENTRY_ID => Some(ID_COL),
            SOUP_LAST_MODIFIED_DATE => Some(LAST_MODIFIED_COL),
            _ => self
                .columns
                .iter()
                .find(|c| c.spec.path == path)
                .map(|c| c.column_name.as_str()),
        }
    }

    /// Like [`column_for_path`](Self::column_for_path), also accepting `_soup`
    pub fn smart_column_for_path(&self, path: &str) -> Option<&str> {
        if path == SOUP_PAYLOAD {
            Some(SOUP_COL)
        } else {
            self.column_for_path(path)
        }
    }

    /// Declared type of an indexed path
    pub fn index_type(&self, path: &str) -> Option<IndexType> {
        self.columns
            .iter()
            .find(|c| c.spec.path == path)
            .map(|c| c.spec.index_type)
    }

    /// `CREATE TABLE` statement
    pub fn create_table_sql(&self) -> String {
        let mut defs = vec![
            format!("{} INTEGER PRIMARY KEY", ID_COL),
            format!("{} TEXT NOT NULL", SOUP_COL),
            format!("{} INTEGER NOT NULL", CREATED_COL),
            format!("{} INTEGER NOT NULL", LAST_MODIFIED_COL),
        ];
        for col in &self.columns {
            let decl = col.spec.index_type.column_decl();
            if decl.is_empty() {
                defs.push(col.column_name.clone());
            } else {
                defs.push(format!("{} {}", col.column_name, decl));
            }
        }
        format!("CREATE TABLE {} ({})", self.table_name, defs.join(", "))
    }

    /// One `CREATE INDEX` per indexed column
    pub fn create_index_sqls(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| {
                format!(
                    "CREATE INDEX {}_idx ON {} ({})",
                    c.column_name, self.table_name, c.column_name
                )
            })
            .collect()
    }

    /// `DROP TABLE` statement
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table_name)
    }
}
