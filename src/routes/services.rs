//! Scheme listing and applications.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::AppError;
use crate::http::request::JsonBody;
use crate::http::server::AppState;
use crate::routes::registry::{find_service, Service, SERVICES};
use crate::security::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub service_code: String,
    #[serde(default)]
    pub form_data: serde_json::Value,
}

/// `GET /services`
pub async fn list_services() -> Json<&'static [Service]> {
    Json(SERVICES)
}

/// `POST /services/apply`
pub async fn apply(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(request): JsonBody<ApplyRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let service = find_service(&request.service_code)
        .ok_or_else(|| AppError::NotFound(format!("service {}", request.service_code)))?;

    let application = state
        .registry
        .submit_application(identity.id(), service, request.form_data);
    tracing::info!(citizen_id = %identity, arn = %application.arn, "Application submitted");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "arn": application.arn,
            "status": application.status,
        })),
    ))
}
