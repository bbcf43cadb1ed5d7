//! Query translation and execution
//!
//! - expr: typed query plan and SQL rendering
//! - translator: query spec -> plan
//! - smart_sql: smart SQL parsing, resolution and caching
//! - cursor: paged result descriptor

pub mod cursor;
pub mod expr;
pub mod smart_sql;
pub mod translator;

pub use cursor::{page_count, StoreCursor};
pub use expr::{QueryPlan, SqlStatement};
pub use smart_sql::{SmartSql, SmartSqlCache};
pub use translator::translate;

use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use smartstore_core::{StoreError, StoreResult};
use smartstore_storage::codec::read_value;
use smartstore_storage::SOUP_COL;

/// Run the page window of `plan`.
///
/// Soup plans yield entry objects; smart plans yield one array per row with
/// payload columns parsed back into objects.
pub fn fetch_page(
    conn: &Connection,
    plan: &QueryPlan,
    page_index: usize,
    page_size: usize,
) -> StoreResult<Vec<Value>> {
    let stmt = plan.page_statement(page_index, page_size);
    match plan {
        QueryPlan::Soup(_) => fetch_entries(conn, &stmt),
        QueryPlan::Smart(smart) => fetch_rows(conn, &smart.sql, &stmt),
    }
}

/// Count every record `plan` matches
pub fn fetch_count(conn: &Connection, plan: &QueryPlan) -> StoreResult<usize> {
    let stmt = plan.count_statement();
    let count: i64 = conn.query_row(&stmt.sql, params_from_iter(stmt.params.iter()), |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as usize)
}

fn fetch_entries(conn: &Connection, stmt: &SqlStatement) -> StoreResult<Vec<Value>> {
    let mut prepared = conn.prepare(&stmt.sql)?;
    let payloads = prepared
        .query_map(params_from_iter(stmt.params.iter()), |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(StoreError::from))
        .collect()
}

/// Payload columns are named on the unwrapped statement; the paging
/// subquery may rename repeated columns.
fn fetch_rows(conn: &Connection, inner_sql: &str, stmt: &SqlStatement) -> StoreResult<Vec<Value>> {
    let payload_columns: Vec<bool> = conn
        .prepare(inner_sql)?
        .column_names()
        .iter()
        .map(|name| *name == SOUP_COL)
        .collect();
    let mut prepared = conn.prepare(&stmt.sql)?;

    let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(payload_columns.len());
        for (i, is_payload) in payload_columns.iter().enumerate() {
            let cell = read_value(row.get_ref(i)?);
            cells.push(match cell {
                Value::String(text) if *is_payload => {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
                other => other,
            });
        }
        out.push(Value::Array(cells));
    }
    Ok(out)
}

