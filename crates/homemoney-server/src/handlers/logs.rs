//! Operation-log sink handlers
//!
//! Ingestion acknowledges immediately and persists in the background; a
//! failed write is logged and never reaches the client.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{AppError, AppState, SuccessResponse};
use homemoney_core::operation_log::DEFAULT_KEEP_DAYS;
use homemoney_core::{LogEntry, LogQuery, LogStats, StoredLog};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListResponse {
    pub logs: Vec<StoredLog>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct CleanQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResponse {
    pub deleted: usize,
    pub days_kept: i64,
}

/// POST /api/logs - Accept a client log entry
pub async fn ingest_log(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<LogEntry>,
) -> Result<(StatusCode, Json<SuccessResponse>), AppError> {
    entry.validate()?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || match db.save_operation_log(&entry) {
        Ok(id) => debug!(log_id = id, log_type = %entry.log_type, "Operation log saved"),
        Err(e) => warn!(log_type = %entry.log_type, "Failed to save operation log: {}", e),
    });

    Ok((StatusCode::ACCEPTED, Json(SuccessResponse { success: true })))
}

/// GET /api/logs - Filtered logs, newest first
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogListResponse>, AppError> {
    let (logs, total) = state.db.list_operation_logs(&query)?;
    let page_size = query.limit();

    Ok(Json(LogListResponse {
        logs,
        total,
        page: query.offset() / page_size + 1,
        page_size,
        total_pages: (total + page_size - 1) / page_size,
    }))
}

/// GET /api/logs/stats - Counts overall and per type
pub async fn log_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogStats>, AppError> {
    Ok(Json(state.db.operation_log_stats(&query)?))
}

/// DELETE /api/logs/clean?days=N - Remove logs older than N days
pub async fn clean_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CleanQuery>,
) -> Result<Json<CleanResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_KEEP_DAYS);
    let deleted = state.db.clean_operation_logs(days, Utc::now())?;
    info!(deleted, days, "Cleaned operation logs");
    Ok(Json(CleanResponse {
        deleted,
        days_kept: days,
    }))
}
