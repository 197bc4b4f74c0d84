//! Health check handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::AppState;

/// Database reachability as reported by health checks
#[derive(Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime: String,
    pub database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct HealthLiteResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
}

fn check_database(state: &AppState) -> DatabaseHealth {
    match state.db.ping() {
        Ok(()) => DatabaseHealth {
            status: "connected",
            error: None,
        },
        Err(e) => DatabaseHealth {
            status: "disconnected",
            error: Some(e.to_string()),
        },
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// GET /api/health - Service status with uptime and database reachability
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: now_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        uptime: format!("{:.2}s", state.started_at.elapsed().as_secs_f64()),
        database: check_database(&state),
    })
}

/// GET /api/health/lite - Minimal status for load balancers
pub async fn health_lite(State(state): State<Arc<AppState>>) -> Json<HealthLiteResponse> {
    Json(HealthLiteResponse {
        status: "OK",
        timestamp: now_rfc3339(),
        database: check_database(&state).status,
    })
}
