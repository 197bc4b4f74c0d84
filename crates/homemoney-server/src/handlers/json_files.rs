//! JSON document store handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{AppError, AppState, SuccessResponse};
use homemoney_core::JsonFileInfo;

#[derive(Serialize)]
pub struct JsonFileListResponse {
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct JsonFileWriteResponse {
    pub success: bool,
    pub filename: String,
}

/// GET /api/json-files - Stored document names
pub async fn list_json_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JsonFileListResponse>, AppError> {
    Ok(Json(JsonFileListResponse {
        files: state.json_files.list()?,
    }))
}

/// GET /api/json-files/:filename - Document contents, `{}` when missing
pub async fn read_json_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.json_files.read(&filename)?))
}

/// POST /api/json-files/:filename - Replace a document
pub async fn write_json_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Json(document): Json<Value>,
) -> Result<Json<JsonFileWriteResponse>, AppError> {
    let path = state.json_files.write(&filename, &document)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(filename);
    Ok(Json(JsonFileWriteResponse {
        success: true,
        filename,
    }))
}

/// DELETE /api/json-files/:filename
pub async fn delete_json_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.json_files.delete(&filename)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/json-files/:filename/info - Size and timestamps
pub async fn json_file_info(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<JsonFileInfo>, AppError> {
    Ok(Json(state.json_files.info(&filename)?))
}
