//! Query specifications
//!
//! A [`QuerySpec`] describes one retrieval against a soup: what to match,
//! how to order, and how many records make a page.
//!
//! | Kind | Matches |
//! |------|---------|
//! | `All` | every record |
//! | `Exact` | indexed value equals `value` |
//! | `Range` | `begin <= indexed value <= end`, either bound optional |
//! | `Like` | indexed value matches a `LIKE` pattern (`%`, `_`) |
//! | `Smart` | a smart SQL statement over `{soup}` / `{soup:path}` references |
//!
//! Specs can also be built from their dictionary form:
//!
//! ```
//! use serde_json::json;
//! use smartstore_core::query::{QueryKind, QuerySpec};
//!
//! let spec = QuerySpec::from_json(
//!     &json!({"queryType": "exact", "indexPath": "name", "matchKey": "Ann", "pageSize": 5}),
//!     10,
//! ).unwrap();
//! assert!(matches!(spec.kind, QueryKind::Exact { .. }));
//! assert_eq!(spec.page_size, 5);
//! ```

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// What a query matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryKind {
    /// Every record of the soup
    All,
    /// Indexed value equal to `value`
    Exact {
        /// Indexed path
        path: String,
        /// Value to match
        value: Value,
    },
    /// Indexed value within the inclusive bounds
    Range {
        /// Indexed path
        path: String,
        /// Lower bound, inclusive
        begin: Option<Value>,
        /// Upper bound, inclusive
        end: Option<Value>,
    },
    /// Indexed value matching a LIKE pattern
    Like {
        /// Indexed path
        path: String,
        /// Pattern with `%` / `_` wildcards
        pattern: String,
    },
    /// Smart SQL statement
    Smart {
        /// Statement with soup/path references
        sql: String,
    },
}

impl QueryKind {
    /// Name used in the dictionary form
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::All => "all",
            QueryKind::Exact { .. } => "exact",
            QueryKind::Range { .. } => "range",
            QueryKind::Like { .. } => "like",
            QueryKind::Smart { .. } => "smart",
        }
    }

    /// Path matched against, for non-smart kinds
    pub fn match_path(&self) -> Option<&str> {
        match self {
            QueryKind::Exact { path, .. }
            | QueryKind::Range { path, .. }
            | QueryKind::Like { path, .. } => Some(path),
            QueryKind::All | QueryKind::Smart { .. } => None,
        }
    }
}

/// Description of one retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Target soup; only smart queries may leave it unset
    pub soup_name: Option<String>,
    /// Match criteria
    pub kind: QueryKind,
    /// Indexed path to order by
    pub order_path: Option<String>,
    /// Sort direction for `order_path`
    pub order: SortOrder,
    /// Records per page, at least 1
    pub page_size: usize,
}

impl QuerySpec {
    fn with_kind(soup_name: Option<String>, kind: QueryKind, page_size: usize) -> Self {
        QuerySpec {
            soup_name,
            kind,
            order_path: None,
            order: SortOrder::Ascending,
            page_size,
        }
    }

    /// Every record of `soup`
    pub fn all(soup: impl Into<String>, page_size: usize) -> Self {
        Self::with_kind(Some(soup.into()), QueryKind::All, page_size)
    }

    /// Records whose `path` equals `value`
    pub fn exact(
        soup: impl Into<String>,
        path: impl Into<String>,
        value: impl Into<Value>,
        page_size: usize,
    ) -> Self {
        let kind = QueryKind::Exact {
            path: path.into(),
            value: value.into(),
        };
        Self::with_kind(Some(soup.into()), kind, page_size)
    }

    /// Records whose `path` lies within `[begin, end]`
    pub fn range(
        soup: impl Into<String>,
        path: impl Into<String>,
        begin: Option<Value>,
        end: Option<Value>,
        page_size: usize,
    ) -> Self {
        let kind = QueryKind::Range {
            path: path.into(),
            begin,
            end,
        };
        Self::with_kind(Some(soup.into()), kind, page_size)
    }

    /// Records whose `path` matches `pattern`
    pub fn like(
        soup: impl Into<String>,
        path: impl Into<String>,
        pattern: impl Into<String>,
        page_size: usize,
    ) -> Self {
        let kind = QueryKind::Like {
            path: path.into(),
            pattern: pattern.into(),
        };
        Self::with_kind(Some(soup.into()), kind, page_size)
    }

    /// Smart SQL statement
    pub fn smart(sql: impl Into<String>, page_size: usize) -> Self {
        Self::with_kind(None, QueryKind::Smart { sql: sql.into() }, page_size)
    }

    /// Order results by `path`
    pub fn order_by(mut self, path: impl Into<String>, order: SortOrder) -> Self {
        self.order_path = Some(path.into());
        self.order = order;
        self
    }

    /// Check the spec is executable
    pub fn validate(&self) -> StoreResult<()> {
        if self.page_size == 0 {
            return Err(StoreError::invalid_input("page size must be at least 1"));
        }
        match &self.kind {
            QueryKind::Smart { sql } => {
                if sql.trim().is_empty() {
                    return Err(StoreError::invalid_input("smart sql must not be empty"));
                }
            }
            _ => {
                if self.soup_name.as_deref().map_or(true, str::is_empty) {
                    return Err(StoreError::invalid_input(format!(
                        "{} queries require a soup name",
                        self.kind.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build a spec from its dictionary form.
    ///
    /// Recognized keys: `queryType`, `soupName`, `indexPath`, `matchKey`,
    /// `beginKey`, `endKey`, `likeKey`, `smartSql`, `orderPath`, `order`,
    /// `pageSize`. `orderPath` defaults to `indexPath`; `pageSize` defaults to
    /// `default_page_size`.
    pub fn from_json(value: &Value, default_page_size: usize) -> StoreResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| StoreError::invalid_input("query spec must be a JSON object"))?;

        let query_type = str_field(map, "queryType")?.unwrap_or("all");
        let soup_name = str_field(map, "soupName")?.map(str::to_string);
        let index_path = str_field(map, "indexPath")?.map(str::to_string);
        let require_path = || {
            index_path.clone().ok_or_else(|| {
                StoreError::invalid_input(format!("{} query requires indexPath", query_type))
            })
        };

        let kind = match query_type {
            "all" => QueryKind::All,
            "exact" => QueryKind::Exact {
                path: require_path()?,
                value: map.get("matchKey").cloned().unwrap_or(Value::Null),
            },
            "range" => {
                let path = require_path()?;
                QueryKind::Range {
                    path,
                    begin: non_null(map.get("beginKey")),
                    end: non_null(map.get("endKey")),
                }
            }
            "like" => QueryKind::Like {
                path: require_path()?,
                pattern: str_field(map, "likeKey")?.unwrap_or("").to_string(),
            },
            "smart" => QueryKind::Smart {
                sql: str_field(map, "smartSql")?
                    .ok_or_else(|| StoreError::invalid_input("smart query requires smartSql"))?
                    .to_string(),
            },
            other => {
                return Err(StoreError::invalid_input(format!(
                    "unknown query type '{}'",
                    other
                )))
            }
        };

        let order = match str_field(map, "order")? {
            None | Some("ascending") => SortOrder::Ascending,
            Some("descending") => SortOrder::Descending,
            Some(other) => {
                return Err(StoreError::invalid_input(format!(
                    "unknown sort order '{}'",
                    other
                )))
            }
        };

        let order_path = match &kind {
            QueryKind::Smart { .. } => None,
            _ => str_field(map, "orderPath")?
                .map(str::to_string)
                .or(index_path),
        };

        let page_size = match map.get("pageSize") {
            None | Some(Value::Null) => default_page_size,
            Some(v) => v
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| StoreError::invalid_input("pageSize must be a positive integer"))?,
        };

        let spec = QuerySpec {
            soup_name,
            kind,
            order_path,
            order,
            page_size,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> StoreResult<Option<&'a str>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(StoreError::invalid_input(format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let spec = QuerySpec::range("people", "age", Some(json!(25)), None, 10)
            .order_by("age", SortOrder::Descending);
        assert_eq!(spec.soup_name.as_deref(), Some("people"));
        assert_eq!(spec.kind.match_path(), Some("age"));
        assert_eq!(spec.order, SortOrder::Descending);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(QuerySpec::all("people", 0).validate().is_err());
    }

    #[test]
    fn test_non_smart_requires_soup() {
        let mut spec = QuerySpec::all("people", 5);
        spec.soup_name = None;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_from_json_range_defaults_order_path() {
        let spec = QuerySpec::from_json(
            &json!({"queryType": "range", "soupName": "people", "indexPath": "age",
                    "beginKey": 20, "endKey": null, "order": "descending"}),
            7,
        )
        .unwrap();
        assert_eq!(spec.page_size, 7);
        assert_eq!(spec.order_path.as_deref(), Some("age"));
        assert_eq!(spec.order, SortOrder::Descending);
        match spec.kind {
            QueryKind::Range { begin, end, .. } => {
                assert_eq!(begin, Some(json!(20)));
                assert_eq!(end, None);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_from_json_smart() {
        let spec = QuerySpec::from_json(
            &json!({"queryType": "smart", "smartSql": "select {people:name} from {people}", "pageSize": 3}),
            10,
        )
        .unwrap();
        assert!(spec.soup_name.is_none());
        assert!(spec.order_path.is_none());
    }

    #[test]
    fn test_from_json_errors() {
        assert!(QuerySpec::from_json(&json!({"queryType": "exact", "soupName": "s"}), 10).is_err());
        assert!(QuerySpec::from_json(&json!({"queryType": "fuzzy", "soupName": "s"}), 10).is_err());
        assert!(QuerySpec::from_json(&json!({"queryType": "smart"}), 10).is_err());
        assert!(QuerySpec::from_json(&json!("all"), 10).is_err());
    }
}
