//! Member handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::subscriptions::SubscriptionView;
use crate::{AppError, AppState};
use homemoney_core::models::{Member, SubscriptionPlan};
use homemoney_core::Error;

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusRequest {
    pub is_active: bool,
}

/// A member with its current subscription, if any
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    #[serde(flatten)]
    pub member: Member,
    pub current_subscription: Option<SubscriptionView>,
}

fn member_or_404(state: &AppState, username: &str) -> Result<Member, AppError> {
    state
        .db
        .get_member_by_username(username)?
        .ok_or_else(|| Error::MemberNotFound(username.to_string()).into())
}

/// POST /api/members - Get or create a member by username
pub async fn get_or_create_member(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MemberRequest>,
) -> Result<Json<Member>, AppError> {
    Ok(Json(state.db.get_or_create_member(&body.username)?))
}

/// GET /api/members - List members, newest first
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Member>>, AppError> {
    Ok(Json(state.db.list_members()?))
}

/// GET /api/members/subscription-plans - Plans open for purchase
pub async fn list_active_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    Ok(Json(state.db.list_plans(true)?))
}

/// GET /api/members/:username - Member with current subscription
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<MemberResponse>, AppError> {
    let now = Utc::now();
    let found = state
        .db
        .get_member_with_subscription(&username, now)?
        .ok_or_else(|| AppError::not_found(&format!("Member {} not found", username)))?;

    Ok(Json(MemberResponse {
        member: found.member,
        current_subscription: found
            .current_subscription
            .map(|s| SubscriptionView::at(s, now)),
    }))
}

/// PUT /api/members/:username/status - Set the active flag
pub async fn update_member_status(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(body): Json<MemberStatusRequest>,
) -> Result<Json<Member>, AppError> {
    Ok(Json(state.db.update_member_status(&username, body.is_active)?))
}

/// GET /api/members/:username/subscriptions - Subscription history
pub async fn list_member_subscriptions(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<SubscriptionView>>, AppError> {
    let member = member_or_404(&state, &username)?;
    let now = Utc::now();
    let history = state
        .db
        .list_member_subscriptions(&member.id)?
        .into_iter()
        .map(|s| SubscriptionView::at(s, now))
        .collect();
    Ok(Json(history))
}

/// GET /api/members/:username/current-subscription - Current subscription or null
pub async fn get_current_subscription(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Option<SubscriptionView>>, AppError> {
    let member = member_or_404(&state, &username)?;
    let now = Utc::now();
    let current = state.db.get_current_subscription(&member.id, now)?;
    Ok(Json(current.map(|s| SubscriptionView::at(s, now))))
}
