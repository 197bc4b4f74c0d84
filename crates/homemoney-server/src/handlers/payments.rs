//! Payment handlers backed by the mock gateway

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{AppError, AppState};
use homemoney_core::payment::{
    append_donation_record, donation_records_path, DonationRecord, SubscribeOrder,
};

#[derive(Debug, Deserialize)]
pub struct DonateRequest {
    #[serde(default)]
    pub username: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePaymentRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub plan_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateResponse {
    pub success: bool,
    pub order_id: String,
    pub record: DonationRecord,
}

#[derive(Serialize)]
pub struct SubscribePaymentResponse {
    pub success: bool,
    #[serde(flatten)]
    pub order: SubscribeOrder,
}

/// POST /api/payments/donate - Charge a donation and record it
pub async fn donate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DonateRequest>,
) -> Result<Json<DonateResponse>, AppError> {
    let record = state.payments.donate(&body.username, body.amount)?;

    let path = donation_records_path(&state.config.data_dir);
    let to_append = record.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = append_donation_record(&path, &to_append) {
            warn!(order_id = %to_append.order_id, "Failed to append donation record: {}", e);
        }
    });

    Ok(Json(DonateResponse {
        success: true,
        order_id: record.order_id.clone(),
        record,
    }))
}

/// POST /api/payments/subscribe - Create an order for a plan
pub async fn subscribe_payment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubscribePaymentRequest>,
) -> Result<Json<SubscribePaymentResponse>, AppError> {
    if body.plan_id.trim().is_empty() {
        return Err(AppError::bad_request("planId is required"));
    }
    let order = state
        .payments
        .subscribe(&state.db, &body.username, &body.plan_id)?;
    Ok(Json(SubscribePaymentResponse {
        success: true,
        order,
    }))
}
