//! Grievance registration and polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::http::request::JsonBody;
use crate::http::server::AppState;
use crate::routes::registry::Grievance;
use crate::security::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct NewGrievance {
    pub subject: String,
    pub description: String,
}

/// `POST /grievance`
pub async fn create_grievance(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(request): JsonBody<NewGrievance>,
) -> (StatusCode, Json<serde_json::Value>) {
    let grievance = state
        .registry
        .create_grievance(identity.id(), request.subject, request.description);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "grievance_id": grievance.grievance_id,
            "status": grievance.status,
        })),
    )
}

/// `GET /grievance/{id}`
pub async fn get_grievance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Grievance>, AppError> {
    state
        .registry
        .grievance(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("grievance {id}")))
}
