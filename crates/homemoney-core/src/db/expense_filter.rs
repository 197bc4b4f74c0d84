//! Expense filter builder for constructing dynamic SQL queries
//!
//! Shared between the paged listing, the count query and the statistics
//! query so all three see exactly the same record set.

use chrono::{DateTime, Utc};

use super::format_timestamp;
use crate::models::SortMode;
use crate::query::ExpenseQuery;

/// Builder for constructing expense query filters
///
/// The lifetime `'query` ties borrowed search terms to the query they came from.
#[derive(Default)]
pub struct ExpenseFilter<'query> {
    pub keyword: Option<&'query str>,
    pub expense_type: Option<&'query str>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub sort: SortMode,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> ExpenseFilter<'query> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter carrying every criterion of a validated query
    pub fn from_query(query: &'query ExpenseQuery) -> Self {
        Self::new()
            .keyword(query.keyword.as_deref())
            .expense_type(query.expense_type.as_deref())
            .time_range(query.start, query.end)
            .amount_range(query.min_amount, query.max_amount)
            .sort(query.sort)
    }

    /// Substring match against type and remark
    pub fn keyword(mut self, keyword: Option<&'query str>) -> Self {
        self.keyword = keyword;
        self
    }

    /// Exact category match
    pub fn expense_type(mut self, expense_type: Option<&'query str>) -> Self {
        self.expense_type = expense_type;
        self
    }

    /// Inclusive time bounds; each side applies independently
    pub fn time_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Inclusive amount bounds
    pub fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Build the filter components
    pub fn build(self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(k) = self.keyword {
            if !k.trim().is_empty() {
                conditions.push(
                    r"(type LIKE ? ESCAPE '\' OR remark LIKE ? ESCAPE '\')".to_string(),
                );
                let pattern = format!("%{}%", escape_like(k.trim()));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some(t) = self.expense_type {
            if !t.trim().is_empty() {
                conditions.push("type = ?".to_string());
                params.push(Box::new(t.trim().to_string()));
            }
        }

        if let Some(start) = self.start {
            conditions.push("time >= ?".to_string());
            params.push(Box::new(format_timestamp(start)));
        }
        if let Some(end) = self.end {
            conditions.push("time <= ?".to_string());
            params.push(Box::new(format_timestamp(end)));
        }

        if let Some(min) = self.min_amount {
            conditions.push("amount >= ?".to_string());
            params.push(Box::new(min));
        }
        if let Some(max) = self.max_amount {
            conditions.push("amount <= ?".to_string());
            params.push(Box::new(max));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Secondary key keeps paging stable across equal times/amounts
        let order_clause = format!("ORDER BY {}, created_at DESC, id", self.sort.order_by());

        FilterResult {
            where_clause,
            order_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Build a COUNT query
    pub fn build_count_query(&self) -> String {
        format!("SELECT COUNT(*) FROM expenses {}", self.where_clause)
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Take ownership of the parameters to append pagination params
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}

/// Escape LIKE metacharacters so the keyword matches literally
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
