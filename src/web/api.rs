// src/web/api.rs
// REST API handlers

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::db::types::{NewComplaint, Status};
use crate::web::state::AppState;

/// Uniform response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Submit a complaint and triage it synchronously
pub async fn submit_complaint(
    State(state): State<AppState>,
    Json(new): Json<NewComplaint>,
) -> impl IntoResponse {
    if new.description.trim().is_empty() {
        return Json(ApiResponse::err("description must not be empty"));
    }

    let id = match state.db.insert_complaint(&new) {
        Ok(id) => id,
        Err(e) => return Json(ApiResponse::err(e.to_string())),
    };

    match state.pipeline.process(id).await {
        Ok(Some(summary)) => Json(ApiResponse::ok(summary)),
        Ok(None) => Json(ApiResponse::err(format!("complaint {id} vanished before processing"))),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.db.get_complaint(id) {
        Ok(Some(complaint)) => Json(ApiResponse::ok(complaint)),
        Ok(None) => Json(ApiResponse::err(format!("complaint {id} not found"))),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

pub async fn list_complaints(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_complaints(100) {
        Ok(complaints) => Json(ApiResponse::ok(complaints)),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

/// Re-run the triage pipeline for an existing complaint
pub async fn process_complaint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.pipeline.process(id).await {
        Ok(Some(summary)) => Json(ApiResponse::ok(summary)),
        Ok(None) => Json(ApiResponse::err(format!("complaint {id} not found"))),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Externally-driven lifecycle transition
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> impl IntoResponse {
    let Some(status) = Status::parse(&update.status) else {
        return Json(ApiResponse::err(format!("unknown status: {}", update.status)));
    };
    match state.db.set_status(id, status) {
        Ok(true) => Json(ApiResponse::ok(serde_json::json!({"id": id, "status": status.as_str()}))),
        Ok(false) => Json(ApiResponse::err(format!("complaint {id} not found"))),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}
