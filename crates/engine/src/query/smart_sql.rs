//! Smart SQL
//!
//! Smart SQL is a single SELECT statement that names soups and indexed paths
//! instead of physical tables and columns:
//!
//! | Reference | Renders as |
//! |-----------|------------|
//! | `{soup}` | `TABLE_<n>` |
//! | `{soup:path}` | `TABLE_<n>_<i>` |
//! | `{soup:_soup}` | `TABLE_<n>.soup` |
//! | `{soup:_soupEntryId}` | `TABLE_<n>.id` |
//! | `{soup:_soupLastModifiedDate}` | `TABLE_<n>.lastModified` |
//!
//! Statements are parsed into [`Segment`]s first; braces inside quoted
//! literals stay text. `--` and `/* */` comments are dropped, so the
//! rendered statement can always be wrapped in a subquery. Rendering then
//! resolves every reference through the catalog.

use smartstore_core::{StoreError, StoreResult, SOUP_ENTRY_ID, SOUP_LAST_MODIFIED_DATE, SOUP_PAYLOAD};
use smartstore_storage::SoupSchema;
use std::collections::{HashMap, VecDeque};

/// Piece of a parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal SQL text
    Text(String),
    /// `{soup}`
    Table {
        /// Referenced soup
        soup: String,
    },
    /// `{soup:path}`
    Column {
        /// Referenced soup
        soup: String,
        /// Indexed or reserved path
        path: String,
    },
}

/// Parsed smart SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSql {
    segments: Vec<Segment>,
}

impl SmartSql {
    /// Parse `sql` into segments.
    ///
    /// Rejects empty input, non-SELECT statements, more than one statement,
    /// unbalanced braces, unterminated literals or comments, and empty
    /// references.
    pub fn parse(sql: &str) -> StoreResult<Self> {
        if sql.trim().is_empty() {
            return Err(StoreError::translation("statement is empty"));
        }

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut quote: Option<char> = None;
        let mut terminated = false;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                text.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '-' if chars.peek() == Some(&'-') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                    text.push(' ');
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            closed = true;
                            break;
                        }
                        prev = c;
                    }
                    if !closed {
                        return Err(StoreError::translation("unterminated comment"));
                    }
                    text.push(' ');
                    continue;
                }
                _ => {}
            }
            if terminated {
                if c.is_whitespace() {
                    continue;
                }
                return Err(StoreError::translation(
                    "only a single statement is allowed",
                ));
            }
            match c {
                '\'' | '"' => {
                    quote = Some(c);
                    text.push(c);
                }
                '{' => {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(StoreError::translation("nested '{' in reference")),
                            _ => inner.push(c),
                        }
                    }
                    if !closed {
                        return Err(StoreError::translation("unbalanced '{'"));
                    }
                    segments.push(parse_reference(&inner)?);
                }
                '}' => return Err(StoreError::translation("unbalanced '}'")),
                ';' => terminated = true,
                _ => text.push(c),
            }
        }
        if quote.is_some() {
            return Err(StoreError::translation("unterminated quoted literal"));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        trim_ends(&mut segments);

        let starts_with_select = match segments.first() {
            Some(Segment::Text(t)) => {
                let t = t.trim_start();
                match (t.get(..6), t.get(6..)) {
                    (Some(head), Some(rest)) => {
                        head.eq_ignore_ascii_case("select")
                            && !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
                    }
                    _ => false,
                }
            }
            _ => false,
        };
        if !starts_with_select {
            return Err(StoreError::translation("only SELECT statements are allowed"));
        }

        Ok(SmartSql { segments })
    }

    /// Parsed segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve every reference and render backend SQL.
    ///
    /// `lookup` returns the schema of a soup, or `None` if it is not
    /// registered.
    pub fn render(
        &self,
        mut lookup: impl FnMut(&str) -> StoreResult<Option<SoupSchema>>,
    ) -> StoreResult<String> {
        let mut schemas: HashMap<&str, SoupSchema> = HashMap::new();
        let mut out = String::new();

        for segment in &self.segments {
            let soup = match segment {
                Segment::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Table { soup } | Segment::Column { soup, .. } => soup.as_str(),
            };
            if !schemas.contains_key(soup) {
                let schema = lookup(soup)?
                    .ok_or_else(|| StoreError::translation(format!("unknown soup '{}'", soup)))?;
                schemas.insert(soup, schema);
            }
            let Some(schema) = schemas.get(soup) else {
                continue;
            };

            match segment {
                Segment::Table { .. } => out.push_str(&schema.table_name),
                Segment::Column { path, .. } => {
                    let column = schema.smart_column_for_path(path).ok_or_else(|| {
                        StoreError::translation(format!(
                            "unknown path '{}' in soup '{}'",
                            path, soup
                        ))
                    })?;
                    if matches!(path.as_str(), SOUP_PAYLOAD | SOUP_ENTRY_ID | SOUP_LAST_MODIFIED_DATE) {
                        out.push_str(&format!("{}.{}", schema.table_name, column));
                    } else {
                        out.push_str(column);
                    }
                }
                Segment::Text(_) => {}
            }
        }
        Ok(out)
    }
}

fn trim_ends(segments: &mut Vec<Segment>) {
    if let Some(Segment::Text(first)) = segments.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        *last = last.trim_end().to_string();
    }
    segments.retain(|s| !matches!(s, Segment::Text(t) if t.is_empty()));
}

fn parse_reference(inner: &str) -> StoreResult<Segment> {
    let (soup, path) = match inner.split_once(':') {
        Some((soup, path)) => (soup.trim(), Some(path.trim())),
        None => (inner.trim(), None),
    };
    if soup.is_empty() {
        return Err(StoreError::translation("empty soup reference"));
    }
    match path {
        None => Ok(Segment::Table {
            soup: soup.to_string(),
        }),
        Some("") => Err(StoreError::translation(format!(
            "empty path in reference to soup '{}'",
            soup
        ))),
        Some(path) => Ok(Segment::Column {
            soup: soup.to_string(),
            path: path.to_string(),
        }),
    }
}

/// Translated statements keyed by their smart SQL text.
///
/// Oldest entries are evicted first; a capacity of 0 disables caching.
#[derive(Debug, Default)]
pub struct SmartSqlCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl SmartSqlCache {
    /// Cache holding at most `capacity` translations
    pub fn new(capacity: usize) -> Self {
        SmartSqlCache {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Cached translation of `smart_sql`
    pub fn get(&self, smart_sql: &str) -> Option<&str> {
        self.entries.get(smart_sql).map(String::as_str)
    }

    /// Remember a translation
    pub fn insert(&mut self, smart_sql: String, sql: String) {
        if self.capacity == 0 || self.entries.contains_key(&smart_sql) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(smart_sql.clone());
        self.entries.insert(smart_sql, sql);
    }

    /// Drop every translation (schema changed)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached translations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
