//! Request inspection helpers.
//!
//! # Responsibilities
//! - Resolve the client address (X-Forwarded-For, then transport peer)
//! - Read the user agent for audit entries
//! - Decode JSON payloads into the gateway error taxonomy
//!
//! # Design Decisions
//! - Only the first X-Forwarded-For hop identifies the client
//! - The peer port is dropped so one client maps to one anonymous key

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequest, Request as ExtractRequest},
    http::{header, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Address the request is attributed to.
pub fn client_address<B>(request: &Request<B>) -> String {
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// JSON body whose rejection is a gateway validation error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: ExtractRequest, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection_message(&rejection))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected application/json".to_string(),
        JsonRejection::JsonSyntaxError(_) => "malformed JSON".to_string(),
        JsonRejection::JsonDataError(e) => e.body_text(),
        other => other.body_text(),
    }
}
