//! Application error taxonomy and its HTTP mapping.
//!
//! # Design Decisions
//! - Every variant carries a message that is safe to show a caller
//! - Store and internal errors are logged in full and answered with a
//!   generic body; no raw store error ever reaches the wire
//! - Probe timeouts are not errors (they surface as partial results)

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::security::identity::AuthError;

/// Gateway-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential missing, malformed, forged or expired.
    #[error("{0}")]
    Unauthorized(#[from] AuthError),

    /// Window count over the tier limit.
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Counter or audit backing store unreachable.
    #[error("backing store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed request payload.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Unknown resource id.
    #[error("{0} not found")]
    NotFound(String),

    /// External provider exhausted its retries. The status route reports
    /// this per source instead.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message returned to the caller.
    fn public_message(&self) -> String {
        match self {
            AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                "internal server error".to_string()
            }
            AppError::UpstreamUnavailable(_) => "service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.public_message(),
            }
        });
        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Unauthorized(AuthError::InvalidCredential).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::StoreUnavailable("conn refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UpstreamUnavailable("pfms".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_secs(60),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }

    #[test]
    fn test_store_detail_is_not_exposed() {
        let err = AppError::StoreUnavailable("redis://10.0.0.4 refused".into());
        assert_eq!(err.public_message(), "internal server error");
    }
}
