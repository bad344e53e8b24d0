//! Liveness and readiness.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub services: Services,
    pub runtime: Runtime,
}

#[derive(Debug, Serialize)]
pub struct Services {
    pub counter_store: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Runtime {
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

/// `GET /health`
///
/// Answers 503 while the counter store is unreachable, since every
/// rate-limited route would fail.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (status, code, counter_store) = match state.counters.ping().await {
        Ok(()) => ("ok", StatusCode::OK, "up"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: counter store down");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };

    (
        code,
        Json(HealthReport {
            status,
            services: Services { counter_store },
            runtime: Runtime {
                version: env!("CARGO_PKG_VERSION"),
                os: std::env::consts::OS,
                arch: std::env::consts::ARCH,
            },
        }),
    )
}
