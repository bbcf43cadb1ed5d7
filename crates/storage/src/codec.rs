//! Row codec
//!
//! Converts between JSON and SQLite values:
//! - [`project_columns`]: payload -> indexed column values, keyed by column name
//! - [`bind_value`]: query argument -> SQL parameter
//! - [`read_value`]: result cell -> JSON

use crate::schema::SoupSchema;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;
use smartstore_core::path::project;
use smartstore_core::IndexType;

/// Project every indexed column out of `payload`
pub fn project_columns(schema: &SoupSchema, payload: &Value) -> Vec<(String, SqlValue)> {
    schema
        .columns
        .iter()
        .map(|col| {
            let projected = project(payload, &col.spec.path);
            (
                col.column_name.clone(),
                column_value(col.spec.index_type, projected.as_ref()),
            )
        })
        .collect()
}

/// Typed column value for a projected JSON value
pub fn column_value(index_type: IndexType, value: Option<&Value>) -> SqlValue {
    let Some(value) = value else {
        return SqlValue::Null;
    };
    match index_type {
        IndexType::String => match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Number(n) => SqlValue::Text(n.to_string()),
            Value::Bool(b) => SqlValue::Text(b.to_string()),
            _ => SqlValue::Null,
        },
        IndexType::Number => match value {
            Value::Number(n) => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or(SqlValue::Null),
            Value::Bool(b) => SqlValue::Real(if *b { 1.0 } else { 0.0 }),
            _ => SqlValue::Null,
        },
        IndexType::Json => bind_value(value),
    }
}

/// SQL parameter for a JSON query argument
pub fn bind_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// JSON value for a result cell
pub fn read_value(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}
