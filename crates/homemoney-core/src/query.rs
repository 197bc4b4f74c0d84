//! Expense query normalization and validation
//!
//! Raw filter parameters (as received from HTTP or the CLI) are turned into a
//! validated [`ExpenseQuery`] before any store access happens.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::SortMode;

/// Default page size for expense listings
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest accepted page size for expense listings
pub const MAX_PAGE_SIZE: i64 = 100;

/// Unvalidated expense filter parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQueryParams {
    pub keyword: Option<String>,
    #[serde(rename = "type")]
    pub expense_type: Option<String>,
    /// `YYYY-MM`; overrides start/end when present
    pub month: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// 1-based page number
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

/// A validated expense filter
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    pub keyword: Option<String>,
    pub expense_type: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub sort: SortMode,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ExpenseQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            expense_type: None,
            start: None,
            end: None,
            min_amount: None,
            max_amount: None,
            sort: SortMode::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ExpenseQuery {
    /// Validate raw parameters into a query
    ///
    /// Out-of-range pagination is rejected rather than clamped.
    pub fn from_params(params: &ExpenseQueryParams) -> Result<Self> {
        let sort = match non_empty(params.sort.as_deref()) {
            Some(token) => token
                .parse::<SortMode>()
                .map_err(|_| Error::InvalidSort(token.to_string()))?,
            None => SortMode::default(),
        };

        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(Error::InvalidPagination(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, limit
            )));
        }
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(Error::InvalidPagination(format!(
                "page must be at least 1, got {}",
                page
            )));
        }

        let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
            Error::InvalidPagination(format!("page {} is out of range", page))
        })?;

        let (start, end) = match non_empty(params.month.as_deref()) {
            Some(month) => {
                let (start, end) = month_range(month)?;
                (Some(start), Some(end))
            }
            None => (
                non_empty(params.start_date.as_deref())
                    .map(|s| parse_bound(s, false))
                    .transpose()?,
                non_empty(params.end_date.as_deref())
                    .map(|s| parse_bound(s, true))
                    .transpose()?,
            ),
        };
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::InvalidRange(
                    "startDate must not be after endDate".into(),
                ));
            }
        }

        for bound in [params.min_amount, params.max_amount].into_iter().flatten() {
            if !bound.is_finite() || bound < 0.0 {
                return Err(Error::InvalidRange(
                    "amount bounds must be non-negative".into(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (params.min_amount, params.max_amount) {
            if min > max {
                return Err(Error::InvalidRange(
                    "minAmount must not exceed maxAmount".into(),
                ));
            }
        }

        Ok(Self {
            keyword: non_empty(params.keyword.as_deref()).map(str::to_string),
            expense_type: non_empty(params.expense_type.as_deref()).map(str::to_string),
            start,
            end,
            min_amount: params.min_amount,
            max_amount: params.max_amount,
            sort,
            limit,
            offset,
        })
    }

    /// 1-based page number derived from offset and limit
    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Expand a `YYYY-MM` token into the first and last instant of that month (UTC)
pub fn month_range(token: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || Error::InvalidMonthFormat(token.to_string());

    let (year, month) = token.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let start = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));
    let end = Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)) - Duration::nanoseconds(1);
    Ok((start, end))
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` day
///
/// A bare day used as an upper bound covers the whole day.
fn parse_bound(s: &str, upper: bool) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("invalid date: {}", s)))?;
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    if upper {
        Ok(start + Duration::days(1) - Duration::nanoseconds(1))
    } else {
        Ok(start)
    }
}
