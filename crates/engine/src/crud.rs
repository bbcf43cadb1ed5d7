//! Entry CRUD against one soup table
//!
//! Every function here runs on a connection already inside the caller's
//! transaction. Upserts resolve the identity of the whole batch first and
//! only then write, so resolution errors never leave partial writes behind.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use smartstore_core::entry::{as_object, entry_id, stamp};
use smartstore_core::path::project;
use smartstore_core::{EntryId, StoreError, StoreResult, SOUP_ENTRY_ID};
use smartstore_storage::codec::{column_value, project_columns};
use smartstore_storage::{
    Catalog, SoupSchema, CREATED_COL, ID_COL, LAST_MODIFIED_COL, SOUP_COL,
};
use std::collections::HashMap;
use tracing::debug;

/// Ids bound per `IN (...)` statement
const ID_CHUNK: usize = 500;

/// Where an upserted record goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// New row
    Insert,
    /// Existing row
    Update(EntryId),
}

/// Batch identity of a coerced external id; `7` and `7.0` are one key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BatchKey {
    Int(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl BatchKey {
    fn of(bound: &SqlValue) -> Option<Self> {
        match bound {
            SqlValue::Null => None,
            SqlValue::Integer(i) => Some(BatchKey::Int(*i)),
            SqlValue::Real(f) => {
                let f = *f + 0.0;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(BatchKey::Int(f as i64))
                } else {
                    Some(BatchKey::Real(f.to_bits()))
                }
            }
            SqlValue::Text(s) => Some(BatchKey::Text(s.clone())),
            SqlValue::Blob(b) => Some(BatchKey::Blob(b.clone())),
        }
    }
}

/// Resolve targets by `_soupEntryId`
pub(crate) fn resolve_by_entry_id(entries: &[Value]) -> StoreResult<Vec<Target>> {
    entries
        .iter()
        .map(|entry| {
            Ok(match entry_id(entry)? {
                Some(id) => Target::Update(id),
                None => Target::Insert,
            })
        })
        .collect()
}

/// Resolve targets by the value at an indexed external id path
pub(crate) fn resolve_by_external_id(
    conn: &Connection,
    schema: &SoupSchema,
    entries: &[Value],
    path: &str,
) -> StoreResult<Vec<Target>> {
    if path == SOUP_ENTRY_ID {
        return resolve_by_entry_id(entries);
    }
    let column = schema
        .column_for_path(path)
        .ok_or_else(|| StoreError::unknown_path(&schema.soup_name, path))?;
    let index_type = schema
        .index_type(path)
        .ok_or_else(|| StoreError::unknown_path(&schema.soup_name, path))?;

    let sql = format!("SELECT {} FROM {} WHERE {} = ?1", ID_COL, schema.table_name, column);
    let mut lookup = conn.prepare(&sql)?;
    let mut seen: HashMap<BatchKey, usize> = HashMap::new();
    let mut targets = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        as_object(entry)?;
        let missing = || StoreError::MissingExternalIdValue {
            path: path.to_string(),
        };
        let value = project(entry, path)
            .filter(|v| !v.is_null())
            .ok_or_else(missing)?;
        let bound = column_value(index_type, Some(&value));
        let key = BatchKey::of(&bound).ok_or_else(missing)?;

        let rendered = value.to_string();
        if let Some(first) = seen.insert(key, position) {
            return Err(StoreError::DuplicateExternalId {
                path: path.to_string(),
                value: rendered,
                reason: format!("records {} and {} of the batch share it", first, position),
            });
        }

        let ids = lookup
            .query_map([&bound], |row| row.get::<_, EntryId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        targets.push(match ids.as_slice() {
            [] => Target::Insert,
            [id] => Target::Update(*id),
            many => {
                return Err(StoreError::DuplicateExternalId {
                    path: path.to_string(),
                    value: rendered,
                    reason: format!("{} existing entries match", many.len()),
                })
            }
        });
    }
    Ok(targets)
}

/// Write `entries` to their resolved targets, returning the stored records
pub(crate) fn write_entries(
    conn: &Connection,
    schema: &SoupSchema,
    entries: Vec<Value>,
    targets: &[Target],
    now: i64,
) -> StoreResult<Vec<Value>> {
    let mut stored = Vec::with_capacity(entries.len());
    let (mut inserted, mut updated) = (0usize, 0usize);
    for (mut entry, target) in entries.into_iter().zip(targets.iter().copied()) {
        match target {
            Target::Insert => {
                let id = Catalog::next_entry_id(conn)?;
                stamp(&mut entry, id, now)?;
                insert_row(conn, schema, id, &entry, now)?;
                inserted += 1;
            }
            Target::Update(id) => {
                stamp(&mut entry, id, now)?;
                update_row(conn, schema, id, &entry, now)?;
                updated += 1;
            }
        }
        stored.push(entry);
    }
    debug!(target: "smartstore::store", soup = %schema.soup_name, inserted, updated, "Entries written");
    Ok(stored)
}

fn insert_row(
    conn: &Connection,
    schema: &SoupSchema,
    id: EntryId,
    entry: &Value,
    now: i64,
) -> StoreResult<()> {
    let projected = project_columns(schema, entry);
    let mut columns = vec![ID_COL, SOUP_COL, CREATED_COL, LAST_MODIFIED_COL];
    let mut values = vec![
        SqlValue::Integer(id),
        SqlValue::Text(serde_json::to_string(entry)?),
        SqlValue::Integer(now),
        SqlValue::Integer(now),
    ];
    for (column, value) in &projected {
        columns.push(column.as_str());
        values.push(value.clone());
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table_name,
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

fn update_row(
    conn: &Connection,
    schema: &SoupSchema,
    id: EntryId,
    entry: &Value,
    now: i64,
) -> StoreResult<()> {
    let projected = project_columns(schema, entry);
    let mut assignments = vec![format!("{} = ?", SOUP_COL), format!("{} = ?", LAST_MODIFIED_COL)];
    let mut values = vec![SqlValue::Text(serde_json::to_string(entry)?), SqlValue::Integer(now)];
    for (column, value) in projected {
        assignments.push(format!("{} = ?", column));
        values.push(value);
    }
    values.push(SqlValue::Integer(id));
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        schema.table_name,
        assignments.join(", "),
        ID_COL
    );
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(StoreError::EntryNotFound {
            soup: schema.soup_name.clone(),
            entry_id: id,
        });
    }
    Ok(())
}

/// Stored records among `ids`; missing ids are omitted
pub(crate) fn retrieve(conn: &Connection, schema: &SoupSchema, ids: &[EntryId]) -> StoreResult<Vec<Value>> {
    let mut out = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            SOUP_COL,
            schema.table_name,
            ID_COL,
            vec!["?"; chunk.len()].join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let payloads = stmt
            .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for payload in payloads {
            out.push(serde_json::from_str(&payload)?);
        }
    }
    Ok(out)
}

/// Delete rows among `ids`, returning how many existed
pub(crate) fn delete(conn: &Connection, schema: &SoupSchema, ids: &[EntryId]) -> StoreResult<usize> {
    let mut removed = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            schema.table_name,
            ID_COL,
            vec!["?"; chunk.len()].join(", ")
        );
        removed += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(removed)
}
