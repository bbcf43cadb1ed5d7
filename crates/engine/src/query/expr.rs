//! Query expression tree
//!
//! Translation never concatenates caller text into SQL. A query spec is
//! first turned into a [`QueryPlan`] whose leaves are physical table/column
//! names taken from the catalog and bound parameters, and only then rendered.
//!
//! ```text
//! QuerySpec --translate--> QueryPlan --render--> SqlStatement
//!                           |- Soup(SoupSelect { table, predicate, order })
//!                           `- Smart(SmartPlan { sql })
//! ```

use rusqlite::types::Value as SqlValue;
use smartstore_core::SortOrder;
use smartstore_storage::{ID_COL, SOUP_COL};

/// Rendered statement with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// SQL text with `?` placeholders
    pub sql: String,
    /// Parameters in placeholder order
    pub params: Vec<SqlValue>,
}

/// Filter over one physical column
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value` (`IS NULL` for a null value)
    Eq {
        /// Physical column
        column: String,
        /// Bound value
        value: SqlValue,
    },
    /// `column >= lower AND column <= upper`, either side optional
    Between {
        /// Physical column
        column: String,
        /// Inclusive lower bound
        lower: Option<SqlValue>,
        /// Inclusive upper bound
        upper: Option<SqlValue>,
    },
    /// `column LIKE pattern`
    Like {
        /// Physical column
        column: String,
        /// Pattern
        pattern: String,
    },
}

impl Predicate {
    fn render(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Predicate::Eq { column, value } => {
                if *value == SqlValue::Null {
                    sql.push_str(&format!(" WHERE {} IS NULL", column));
                } else {
                    sql.push_str(&format!(" WHERE {} = ?", column));
                    params.push(value.clone());
                }
            }
            Predicate::Between {
                column,
                lower,
                upper,
            } => {
                let mut terms = Vec::new();
                if let Some(lower) = lower {
                    terms.push(format!("{} >= ?", column));
                    params.push(lower.clone());
                }
                if let Some(upper) = upper {
                    terms.push(format!("{} <= ?", column));
                    params.push(upper.clone());
                }
                if !terms.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&terms.join(" AND "));
                }
            }
            Predicate::Like { column, pattern } => {
                sql.push_str(&format!(" WHERE {} LIKE ?", column));
                params.push(SqlValue::Text(pattern.clone()));
            }
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Physical column
    pub column: String,
    /// Direction
    pub order: SortOrder,
}

/// Select over one soup table
#[derive(Debug, Clone, PartialEq)]
pub struct SoupSelect {
    /// Physical table
    pub table: String,
    /// Optional filter
    pub predicate: Option<Predicate>,
    /// Sort keys, always ending with `id ASC`
    pub order: Vec<OrderTerm>,
}

impl SoupSelect {
    /// Select `table`, ordered by `order_column` (if any) then entry id.
    pub fn new(
        table: impl Into<String>,
        predicate: Option<Predicate>,
        order_column: Option<(String, SortOrder)>,
    ) -> Self {
        let mut order = Vec::new();
        if let Some((column, dir)) = order_column {
            if column != ID_COL {
                order.push(OrderTerm { column, order: dir });
            } else {
                order.push(OrderTerm {
                    column: ID_COL.to_string(),
                    order: dir,
                });
                return SoupSelect {
                    table: table.into(),
                    predicate,
                    order,
                };
            }
        }
        order.push(OrderTerm {
            column: ID_COL.to_string(),
            order: SortOrder::Ascending,
        });
        SoupSelect {
            table: table.into(),
            predicate,
            order,
        }
    }

    fn render_filtered(&self, projection: &str) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT {} FROM {}", projection, self.table);
        let mut params = Vec::new();
        if let Some(predicate) = &self.predicate {
            predicate.render(&mut sql, &mut params);
        }
        (sql, params)
    }
}

/// Compiled smart SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartPlan {
    /// Backend SQL with all references resolved
    pub sql: String,
}

/// Translated query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// Query spec over one soup
    Soup(SoupSelect),
    /// Smart SQL statement
    Smart(SmartPlan),
}

impl QueryPlan {
    /// Statement returning one page
    pub fn page_statement(&self, page_index: usize, page_size: usize) -> SqlStatement {
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        let offset = page_index
            .checked_mul(page_size)
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(i64::MAX);
        match self {
            QueryPlan::Soup(select) => {
                let (mut sql, mut params) = select.render_filtered(SOUP_COL);
                let order: Vec<String> = select
                    .order
                    .iter()
                    .map(|t| format!("{} {}", t.column, t.order.as_sql()))
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&order.join(", "));
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(SqlValue::Integer(limit));
                params.push(SqlValue::Integer(offset));
                SqlStatement { sql, params }
            }
            QueryPlan::Smart(plan) => SqlStatement {
                sql: format!("SELECT * FROM ({}) LIMIT ? OFFSET ?", plan.sql),
                params: vec![SqlValue::Integer(limit), SqlValue::Integer(offset)],
            },
        }
    }

    /// Statement counting every match
    pub fn count_statement(&self) -> SqlStatement {
        match self {
            QueryPlan::Soup(select) => {
                let (sql, params) = select.render_filtered("count(*)");
                SqlStatement { sql, params }
            }
            QueryPlan::Smart(plan) => SqlStatement {
                sql: format!("SELECT count(*) FROM ({})", plan.sql),
                params: Vec::new(),
            },
        }
    }
}
