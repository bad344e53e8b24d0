//! Citizen profile handlers.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::AppError;
use crate::http::request::JsonBody;
use crate::http::server::AppState;
use crate::routes::registry::Citizen;
use crate::security::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub mobile_number: String,
}

/// `GET /citizen/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Citizen>, AppError> {
    state
        .registry
        .citizen(identity.id())
        .map(Json)
        .ok_or_else(|| AppError::NotFound("citizen".into()))
}

/// `PUT /citizen/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(update): JsonBody<UpdateProfile>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state
        .registry
        .update_mobile_number(identity.id(), update.mobile_number)
    {
        return Err(AppError::NotFound("citizen".into()));
    }
    tracing::info!(citizen_id = %identity, "Profile updated");
    Ok(Json(serde_json::json!({ "status": "success" })))
}
