//! Plan catalog administration handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{AppError, AppState};
use homemoney_core::models::{NewPlan, SubscriptionPlan};

/// GET /api/admin/subscription-plans - Every plan, active or not
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    Ok(Json(state.db.list_plans(false)?))
}

/// POST /api/admin/subscription-plans
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPlan>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), AppError> {
    let plan = state.db.create_plan(&body)?;
    info!(plan_id = %plan.id, name = %plan.name, "Plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /api/admin/subscription-plans/:id
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<NewPlan>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    Ok(Json(state.db.update_plan(&id, &body)?))
}

/// POST /api/admin/subscription-plans/:id/toggle - Flip the active flag
pub async fn toggle_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    Ok(Json(state.db.toggle_plan_status(&id)?))
}

/// DELETE /api/admin/subscription-plans/:id
///
/// Subscriptions that reference the plan are kept; renewing them afterwards
/// fails with a not-found error.
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.delete_plan(&id)?;
    info!(plan_id = %id, "Plan deleted");
    Ok(StatusCode::NO_CONTENT)
}
