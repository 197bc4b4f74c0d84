//! Operation-log persistence

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};
use serde_json::Value;

use super::Database;
use crate::error::Result;
use crate::lifecycle;
use crate::operation_log::{LogEntry, LogPeriod, LogQuery, LogStats, LogTypeStat, StoredLog, LOG_TYPES};

fn parse_json_column(raw: Option<String>) -> Value {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

fn row_to_log(row: &Row) -> rusqlite::Result<StoredLog> {
    Ok(StoredLog {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        log_type: row.get(2)?,
        action: row.get(3)?,
        request_id: row.get(4)?,
        user: parse_json_column(row.get(5)?),
        device: parse_json_column(row.get(6)?),
        page: parse_json_column(row.get(7)?),
        details: parse_json_column(row.get(8)?),
        created_at: row.get(9)?,
    })
}

/// WHERE clause and params shared by list and count
fn build_conditions(query: &LogQuery, log_type: Option<&str>) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(t) = log_type.filter(|t| !t.is_empty()) {
        conditions.push("type = ?");
        params.push(Box::new(t.to_string()));
    }
    if let Some(u) = query.username.as_deref().filter(|u| !u.is_empty()) {
        conditions.push("(user_info LIKE ? OR user_info LIKE ?)");
        params.push(Box::new(format!("%\"username\":\"{}\"%", u)));
        params.push(Box::new(format!("%\"email\":\"{}\"%", u)));
    }
    if let Some(start) = query.start_date.as_deref().filter(|s| !s.is_empty()) {
        conditions.push("timestamp >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = query.end_date.as_deref().filter(|s| !s.is_empty()) {
        conditions.push("timestamp <= ?");
        params.push(Box::new(end.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, params)
}

impl Database {
    /// Persist a client log entry
    pub fn save_operation_log(&self, entry: &LogEntry) -> Result<i64> {
        entry.validate()?;

        let to_json = |v: &Option<Value>| -> Result<String> {
            Ok(serde_json::to_string(v.as_ref().unwrap_or(&Value::Null))?)
        };
        let details = match entry.condensed_details() {
            Some(d) => serde_json::to_string(&d)?,
            None => "null".to_string(),
        };

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO operation_logs
                (timestamp, type, action, request_id, user_info, device_info, page_info, details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.timestamp,
                entry.log_type,
                entry.action,
                entry.request_id,
                to_json(&entry.user)?,
                to_json(&entry.device)?,
                to_json(&entry.page)?,
                details,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Count logs matching a query, optionally narrowed to one type
    fn count_operation_logs(&self, query: &LogQuery, log_type: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;
        let (where_clause, params) = build_conditions(query, log_type);
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM operation_logs {}", where_clause),
            refs.as_slice(),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// One page of logs, newest first, plus the total match count
    pub fn list_operation_logs(&self, query: &LogQuery) -> Result<(Vec<StoredLog>, i64)> {
        let conn = self.conn()?;
        let (where_clause, mut params) = build_conditions(query, query.log_type.as_deref());
        params.push(Box::new(query.limit()));
        params.push(Box::new(query.offset()));
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT id, timestamp, type, action, request_id, user_info, device_info, page_info, details,
                   CAST(created_at AS TEXT)
            FROM operation_logs {}
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            where_clause
        ))?;
        let logs = stmt
            .query_map(refs.as_slice(), row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total = self.count_operation_logs(query, query.log_type.as_deref())?;
        Ok((logs, total))
    }

    /// Overall and per-type counts for the known log types
    pub fn operation_log_stats(&self, query: &LogQuery) -> Result<LogStats> {
        let type_stats = LOG_TYPES
            .into_iter()
            .map(|t| {
                Ok(LogTypeStat {
                    log_type: t.to_string(),
                    count: self.count_operation_logs(query, Some(t))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LogStats {
            total: self.count_operation_logs(query, None)?,
            type_stats,
            period: LogPeriod {
                start: query.start_date.clone(),
                end: query.end_date.clone(),
            },
        })
    }

    /// Delete logs older than `days_to_keep` days; returns the number removed
    pub fn clean_operation_logs(&self, days_to_keep: i64, now: DateTime<Utc>) -> Result<usize> {
        lifecycle::check_days("days", days_to_keep)?;
        let cutoff = lifecycle::shift_days(now, -days_to_keep)?
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM operation_logs WHERE timestamp < ?",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}
