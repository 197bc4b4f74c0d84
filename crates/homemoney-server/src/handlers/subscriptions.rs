//! Subscription lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AppError, AppState};
use homemoney_core::lifecycle;
use homemoney_core::models::{NewSubscription, UserSubscription};

/// A subscription plus whether it is current at response time
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: UserSubscription,
    pub is_active: bool,
}

impl SubscriptionView {
    pub fn at(subscription: UserSubscription, now: DateTime<Utc>) -> Self {
        let is_active = lifecycle::is_current(&subscription, now);
        Self {
            subscription,
            is_active,
        }
    }
}

/// POST /api/subscriptions - Subscribe a member to a plan
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewSubscription>,
) -> Result<(StatusCode, Json<SubscriptionView>), AppError> {
    let now = Utc::now();
    let subscription = state.db.create_subscription(&body, now)?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionView::at(subscription, now)),
    ))
}

/// DELETE /api/subscriptions/:id - Cancel a subscription
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>, AppError> {
    let subscription = state.db.cancel_subscription(&id)?;
    Ok(Json(SubscriptionView::at(subscription, Utc::now())))
}

/// POST /api/subscriptions/:id/renew - Extend by one plan duration
///
/// Whether a canceled or expired subscription may be renewed depends on the
/// configured renew policy.
pub async fn renew_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>, AppError> {
    let now = Utc::now();
    let subscription = state
        .db
        .renew_subscription(&id, state.config.renew_policy, now)?;
    Ok(Json(SubscriptionView::at(subscription, now)))
}
