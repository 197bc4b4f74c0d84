//! Expense handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{AppError, AppState};
use homemoney_core::models::{Expense, ExpenseMeta, ExpenseStatistics, NewExpense};
use homemoney_core::{ExpenseQuery, ExpenseQueryParams};

/// One page of expenses with filter metadata
#[derive(Serialize)]
pub struct ExpenseListResponse {
    pub data: Vec<Expense>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub meta: ExpenseMeta,
}

/// GET /api/expenses - List expenses with filters and pagination
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExpenseQueryParams>,
) -> Result<Json<ExpenseListResponse>, AppError> {
    let query = ExpenseQuery::from_params(&params)?;
    let (data, total) = state.db.list_expenses(&query)?;

    let meta = state.db.expense_meta()?;

    Ok(Json(ExpenseListResponse {
        data,
        total,
        page: query.page(),
        limit: query.limit,
        meta,
    }))
}

/// POST /api/expenses - Create an expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense = state.db.create_expense(&body)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// POST /api/expenses/batch - Create several expenses atomically
pub async fn create_expenses_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Vec<NewExpense>>,
) -> Result<(StatusCode, Json<Vec<Expense>>), AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("At least one expense is required"));
    }
    let created = state.db.create_expenses_batch(&body)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/expenses/statistics - Aggregate over every matching expense
pub async fn expense_statistics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExpenseQueryParams>,
) -> Result<Json<ExpenseStatistics>, AppError> {
    let query = ExpenseQuery::from_params(&params)?;
    Ok(Json(state.db.expense_statistics(&query)?))
}

/// GET /api/expenses/:id
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Expense>, AppError> {
    let expense = state
        .db
        .get_expense(&id)?
        .ok_or_else(|| AppError::not_found(&format!("Expense {} not found", id)))?;
    Ok(Json(expense))
}

/// PUT /api/expenses/:id - Replace every field of an expense
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<NewExpense>,
) -> Result<Json<Expense>, AppError> {
    Ok(Json(state.db.update_expense(&id, &body)?))
}

/// DELETE /api/expenses/:id
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.delete_expense(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
