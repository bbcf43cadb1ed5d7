//! Soup entries
//!
//! A soup entry is a JSON object. The store writes two bookkeeping fields
//! into it:
//! - `_soupEntryId`: identifier assigned on first insert
//! - `_soupLastModifiedDate`: epoch milliseconds of the last upsert

use crate::error::{StoreError, StoreResult};
use serde_json::{Map, Value};

/// Field holding the entry identifier
pub const SOUP_ENTRY_ID: &str = "_soupEntryId";

/// Field holding the last modification time (epoch millis)
pub const SOUP_LAST_MODIFIED_DATE: &str = "_soupLastModifiedDate";

/// Pseudo-path selecting the raw payload in smart SQL
pub const SOUP_PAYLOAD: &str = "_soup";

/// Entry identifier
pub type EntryId = i64;

/// Borrow the entry as an object, rejecting other JSON kinds
pub fn as_object(entry: &Value) -> StoreResult<&Map<String, Value>> {
    entry
        .as_object()
        .ok_or_else(|| StoreError::invalid_input("soup entries must be JSON objects"))
}

/// Read `_soupEntryId`, if present and integral.
///
/// Returns an error when the field is present but is not an integer.
pub fn entry_id(entry: &Value) -> StoreResult<Option<EntryId>> {
    match as_object(entry)?.get(SOUP_ENTRY_ID) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| {
            StoreError::invalid_input(format!("{} must be an integer, got {}", SOUP_ENTRY_ID, v))
        }),
    }
}

/// Stamp identifier and modification time onto the entry
pub fn stamp(entry: &mut Value, id: EntryId, last_modified: i64) -> StoreResult<()> {
    let map = entry
        .as_object_mut()
        .ok_or_else(|| StoreError::invalid_input("soup entries must be JSON objects"))?;
    map.insert(SOUP_ENTRY_ID.to_string(), Value::from(id));
    map.insert(SOUP_LAST_MODIFIED_DATE.to_string(), Value::from(last_modified));
    Ok(())
}
