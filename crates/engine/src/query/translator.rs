//! Query spec translation
//!
//! Resolves the paths a [`QuerySpec`] names against the soup's declared
//! indexes and builds a [`QueryPlan`]. Every failure is reported before any
//! statement runs.

use super::expr::{Predicate, QueryPlan, SmartPlan, SoupSelect};
use super::smart_sql::{SmartSql, SmartSqlCache};
use rusqlite::Connection;
use smartstore_core::{QueryKind, QuerySpec, StoreError, StoreResult};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use smartstore_storage::codec::{bind_value, column_value};
use smartstore_storage::{Catalog, SoupSchema};
use tracing::debug;

/// Translate `spec` into an executable plan
pub fn translate(
    spec: &QuerySpec,
    conn: &Connection,
    catalog: &mut Catalog,
    cache: &mut SmartSqlCache,
) -> StoreResult<QueryPlan> {
    spec.validate()?;

    if let QueryKind::Smart { sql } = &spec.kind {
        return Ok(QueryPlan::Smart(compile_smart(sql, conn, catalog, cache)?));
    }

    let soup = spec
        .soup_name
        .as_deref()
        .ok_or_else(|| StoreError::invalid_input("query requires a soup name"))?;
    let schema = catalog.require(conn, soup)?;

    let predicate = match &spec.kind {
        QueryKind::All => None,
        QueryKind::Exact { path, value } => Some(Predicate::Eq {
            column: resolve(&schema, path)?,
            value: bind_for(&schema, path, value),
        }),
        QueryKind::Range { path, begin, end } => Some(Predicate::Between {
            column: resolve(&schema, path)?,
            lower: begin.as_ref().map(|v| bind_for(&schema, path, v)),
            upper: end.as_ref().map(|v| bind_for(&schema, path, v)),
        }),
        QueryKind::Like { path, pattern } => Some(Predicate::Like {
            column: resolve(&schema, path)?,
            pattern: pattern.clone(),
        }),
        QueryKind::Smart { .. } => None,
    };

    let order_column = match &spec.order_path {
        Some(path) => Some((resolve(&schema, path)?, spec.order)),
        None => None,
    };

    Ok(QueryPlan::Soup(SoupSelect::new(
        schema.table_name.clone(),
        predicate,
        order_column,
    )))
}

/// Translate smart SQL, going through the per-store cache
pub fn compile_smart(
    smart_sql: &str,
    conn: &Connection,
    catalog: &mut Catalog,
    cache: &mut SmartSqlCache,
) -> StoreResult<SmartPlan> {
    if let Some(sql) = cache.get(smart_sql) {
        return Ok(SmartPlan {
            sql: sql.to_string(),
        });
    }
    let parsed = SmartSql::parse(smart_sql)?;
    let sql = parsed.render(|soup| catalog.schema(conn, soup))?;
    debug!(target: "smartstore::query", references = parsed.segments().len(), "Smart SQL translated");
    cache.insert(smart_sql.to_string(), sql.clone());
    Ok(SmartPlan { sql })
}

fn resolve(schema: &SoupSchema, path: &str) -> StoreResult<String> {
    schema
        .column_for_path(path)
        .map(str::to_string)
        .ok_or_else(|| StoreError::unknown_path(&schema.soup_name, path))
}

/// Bind a query value the way upserts store it in the column for `path`.
///
/// Reserved paths have no declared type and keep the plain binding. A
/// non-null value the index type cannot hold also keeps it, so it matches
/// nothing instead of matching the null cells.
fn bind_for(schema: &SoupSchema, path: &str, value: &Value) -> SqlValue {
    match schema.index_type(path) {
        Some(index_type) => match column_value(index_type, Some(value)) {
            SqlValue::Null if !value.is_null() => bind_value(value),
            bound => bound,
        },
        None => bind_value(value),
    }
}
