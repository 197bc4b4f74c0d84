//! Subscription sweep handlers
//!
//! The same sweeps the scheduler runs, callable on demand.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::subscriptions::SubscriptionView;
use crate::{AppError, AppState};
use homemoney_core::lifecycle::DEFAULT_EXPIRING_DAYS;

#[derive(Serialize)]
pub struct ExpiredResponse {
    pub expired: usize,
}

#[derive(Serialize)]
pub struct RenewedResponse {
    pub renewed: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct ExpiringResponse {
    pub days: i64,
    pub subscriptions: Vec<SubscriptionView>,
}

/// GET /api/maintenance/check-subscriptions - Expire overdue subscriptions
pub async fn check_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExpiredResponse>, AppError> {
    let expired = state.db.expire_overdue_subscriptions(Utc::now())?;
    Ok(Json(ExpiredResponse { expired }))
}

/// GET /api/maintenance/process-renewals - Extend overdue auto-renewing subscriptions
pub async fn process_renewals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RenewedResponse>, AppError> {
    let renewed = state.db.auto_renew_subscriptions(Utc::now())?;
    Ok(Json(RenewedResponse { renewed }))
}

/// GET /api/maintenance/expiring-subscriptions?days=N - Active subscriptions ending soon
pub async fn expiring_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<ExpiringResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    let now = Utc::now();
    let subscriptions = state
        .db
        .get_expiring_subscriptions(days, now)?
        .into_iter()
        .map(|s| SubscriptionView::at(s, now))
        .collect();
    Ok(Json(ExpiringResponse {
        days,
        subscriptions,
    }))
}
