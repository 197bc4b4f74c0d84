//! Client operation-log entries
//!
//! Front-end clients post structured log entries (user actions, API calls,
//! errors, performance samples). Details are condensed per entry type before
//! they are stored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Entry types reported by clients, in display order
pub const LOG_TYPES: [&str; 7] = [
    "user_action",
    "api_request",
    "api_response",
    "api_error",
    "page_error",
    "performance",
    "console_log",
];

/// Default page size for log listings
pub const DEFAULT_LOG_LIMIT: i64 = 100;

/// Largest page size for log listings
pub const MAX_LOG_LIMIT: i64 = 1000;

/// Days of logs kept by a clean run when none is specified
pub const DEFAULT_KEEP_DAYS: i64 = 45;

/// A log entry as posted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub log_type: String,
    pub action: Option<String>,
    pub request_id: Option<String>,
    pub user: Option<Value>,
    pub device: Option<Value>,
    pub page: Option<Value>,
    pub details: Option<Map<String, Value>>,
    pub request: Option<Map<String, Value>>,
    pub response: Option<Map<String, Value>>,
    pub error: Option<Value>,
    pub duration: Option<i64>,
    pub metric: Option<String>,
    pub value: Option<Value>,
    pub context: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
}

impl LogEntry {
    pub fn validate(&self) -> Result<()> {
        if self.timestamp.trim().is_empty() || self.log_type.trim().is_empty() {
            return Err(Error::InvalidData(
                "log entries require timestamp and type".into(),
            ));
        }
        Ok(())
    }

    /// Details worth persisting for this entry's type
    ///
    /// Null values are dropped; `None` when nothing remains.
    pub fn condensed_details(&self) -> Option<Value> {
        let mut details = Map::new();

        match self.log_type.as_str() {
            "api_request" | "api_response" | "api_error" => {
                if let Some(request) = &self.request {
                    for key in ["method", "url", "params", "body", "hasBody", "bodyType", "bodySize"] {
                        copy_field(request, key, key, &mut details);
                    }
                }
                if let Some(response) = &self.response {
                    copy_field(response, "status", "status", &mut details);
                    copy_field(response, "statusText", "statusText", &mut details);
                    copy_field(response, "data", "responseData", &mut details);
                    copy_field(response, "headers", "responseHeaders", &mut details);
                    if let Some(truncated) = response
                        .get("data")
                        .and_then(Value::as_object)
                        .and_then(|data| data.get("truncated"))
                    {
                        details.insert("truncated".into(), truncated.clone());
                    }
                }
                if let Some(error) = &self.error {
                    details.insert("error".into(), error.clone());
                }
                if let Some(duration) = self.duration.filter(|d| *d > 0) {
                    details.insert("duration".into(), duration.into());
                }
            }
            "console_log" => {
                insert_opt(&mut details, "level", self.level.clone().map(Value::from));
                insert_opt(&mut details, "message", self.message.clone().map(Value::from));
            }
            "performance" => {
                insert_opt(&mut details, "metric", self.metric.clone().map(Value::from));
                insert_opt(&mut details, "value", self.value.clone());
                insert_opt(&mut details, "context", self.context.clone().map(Value::from));
            }
            _ => {
                if let Some(error) = &self.error {
                    details.insert("error".into(), error.clone());
                }
                if let Some(extra) = &self.details {
                    for (k, v) in extra {
                        details.insert(k.clone(), v.clone());
                    }
                }
            }
        }

        details.retain(|_, v| !v.is_null());
        if details.is_empty() {
            None
        } else {
            Some(Value::Object(details))
        }
    }
}

fn copy_field(source: &Map<String, Value>, from: &str, to: &str, dest: &mut Map<String, Value>) {
    if let Some(v) = source.get(from) {
        dest.insert(to.to_string(), v.clone());
    }
}

fn insert_opt(dest: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        dest.insert(key.to_string(), v);
    }
}

/// A persisted log entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    pub id: i64,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub log_type: String,
    pub action: Option<String>,
    pub request_id: Option<String>,
    pub user: Value,
    pub device: Value,
    pub page: Value,
    pub details: Value,
    pub created_at: String,
}

/// Filters for listing and counting logs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    /// Matched against the stored user's username or email
    pub username: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LogQuery {
    /// Page size, clamped to `[1, MAX_LOG_LIMIT]`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Count of logs of one type
#[derive(Debug, Clone, Serialize)]
pub struct LogTypeStat {
    #[serde(rename = "type")]
    pub log_type: String,
    pub count: i64,
}

/// Reporting period echoed back with stats
#[derive(Debug, Clone, Serialize)]
pub struct LogPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Log counts overall and per type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: i64,
    pub type_stats: Vec<LogTypeStat>,
    pub period: LogPeriod,
}
