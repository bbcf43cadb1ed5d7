//! Dotted field paths
//!
//! Index paths address fields with dots: `"address.city"`. Projection walks
//! objects key by key. When it meets an array before the path is exhausted,
//! the remaining path is projected over every element and the non-missing
//! results are collected into an array.
//!
//! ```
//! use serde_json::json;
//! use smartstore_core::path::project;
//!
//! let doc = json!({"a": {"b": [{"c": 1}, {"c": 2}, {"d": 3}]}});
//! assert_eq!(project(&doc, "a.b.c"), Some(json!([1, 2])));
//! assert_eq!(project(&doc, "a.x"), None);
//! ```

use serde_json::Value;

/// Project the value at `path` out of `value`.
///
/// Returns `None` when any segment is missing. An empty path returns the
/// value itself.
pub fn project(value: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(value.clone());
    }
    let segments: Vec<&str> = path.split('.').collect();
    project_segments(value, &segments)
}

fn project_segments(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match value {
        Value::Object(map) => map.get(*head).and_then(|v| project_segments(v, rest)),
        Value::Array(items) => {
            let projected: Vec<Value> = items
                .iter()
                .filter_map(|item| project_segments(item, segments))
                .collect();
            Some(Value::Array(projected))
        }
        _ => None,
    }
}
