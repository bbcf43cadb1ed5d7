//! Store cursors
//!
//! A cursor is a snapshot descriptor of a paged query: the count and the
//! current page taken together. It is not live; moving to another page
//! re-runs the query.

use serde::Serialize;
use serde_json::{json, Value};
use smartstore_core::QuerySpec;
use uuid::Uuid;

/// Paged query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreCursor {
    /// Unique cursor id
    pub cursor_id: String,
    /// Soup the query targets; `None` for smart queries
    pub soup_name: Option<String>,
    /// Query being paged
    pub query_spec: QuerySpec,
    /// Records per page
    pub page_size: usize,
    /// Matching records at the time of the last (re)query
    pub total_entries: usize,
    /// `ceil(total_entries / page_size)`
    pub total_pages: usize,
    /// Index of the page held in `current_page_entries`
    pub current_page_index: usize,
    /// Records of the current page, in query order
    pub current_page_entries: Vec<Value>,
}

impl StoreCursor {
    pub(crate) fn new(query_spec: QuerySpec, total_entries: usize, first_page: Vec<Value>) -> Self {
        let page_size = query_spec.page_size;
        StoreCursor {
            cursor_id: Uuid::new_v4().to_string(),
            soup_name: query_spec.soup_name.clone(),
            total_pages: page_count(total_entries, page_size),
            page_size,
            total_entries,
            current_page_index: 0,
            current_page_entries: first_page,
            query_spec,
        }
    }

    /// Whether a page follows the current one
    pub fn has_next_page(&self) -> bool {
        self.current_page_index + 1 < self.total_pages
    }

    /// Dictionary form handed to host bridges
    pub fn to_json(&self) -> Value {
        json!({
            "cursorId": self.cursor_id,
            "soupName": self.soup_name,
            "pageSize": self.page_size,
            "totalEntries": self.total_entries,
            "totalPages": self.total_pages,
            "currentPageIndex": self.current_page_index,
            "currentPageOrderedEntries": self.current_page_entries,
        })
    }
}

/// Pages needed for `total` records
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}
