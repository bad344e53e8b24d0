//! Best-effort audit recording of privileged actions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{FixedOffset, Offset, Utc};

use crate::audit::sink::{AuditEntry, AuditSink};
use crate::config::AuditMode;
use crate::http::request::{client_address, user_agent};
use crate::observability::metrics;
use crate::security::identity::Identity;

/// Writes audit entries and swallows write failures.
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    offset: FixedOffset,
    mode: AuditMode,
}

impl AuditRecorder {
    /// `utc_offset_minutes` outside one day falls back to UTC.
    pub fn new(sink: Arc<dyn AuditSink>, utc_offset_minutes: i32, mode: AuditMode) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        Self { sink, offset, mode }
    }

    pub fn mode(&self) -> AuditMode {
        self.mode
    }

    /// Record an attempted action.
    pub async fn record(
        &self,
        identity: Identity,
        action: &str,
        resource: &str,
        source_address: &str,
        user_agent: &str,
    ) {
        self.write(identity, action, resource, source_address, user_agent, None)
            .await;
    }

    /// Record an action together with the status the handler produced.
    pub async fn record_outcome(
        &self,
        identity: Identity,
        action: &str,
        resource: &str,
        source_address: &str,
        user_agent: &str,
        status: StatusCode,
    ) {
        self.write(
            identity,
            action,
            resource,
            source_address,
            user_agent,
            Some(status.as_u16()),
        )
        .await;
    }

    async fn write(
        &self,
        identity: Identity,
        action: &str,
        resource: &str,
        source_address: &str,
        user_agent: &str,
        status_code: Option<u16>,
    ) {
        let entry = AuditEntry {
            identity,
            action: action.to_string(),
            resource: resource.to_string(),
            source_address: source_address.to_string(),
            user_agent: user_agent.to_string(),
            recorded_at: Utc::now().with_timezone(&self.offset),
            status_code,
        };

        if let Err(e) = self.sink.append(&entry).await {
            metrics::record_audit_failure();
            tracing::error!(
                error = %e,
                citizen_id = %identity,
                action,
                "Failed to write audit log"
            );
        }
    }
}

/// Route-specific audit stage state.
#[derive(Clone)]
pub struct AuditStage {
    pub recorder: Arc<AuditRecorder>,
    pub action: &'static str,
    pub resource: &'static str,
}

/// Audit stage: record the caller's action; never alters the response.
pub async fn audit_middleware(
    State(stage): State<AuditStage>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<Identity>().copied() else {
        return next.run(request).await;
    };
    let source_address = client_address(&request);
    let agent = user_agent(&request);
    let recorder = &stage.recorder;

    match recorder.mode() {
        AuditMode::Intent => {
            recorder
                .record(identity, stage.action, stage.resource, &source_address, &agent)
                .await;
            next.run(request).await
        }
        AuditMode::Outcome => {
            let response = next.run(request).await;
            recorder
                .record_outcome(
                    identity,
                    stage.action,
                    stage.resource,
                    &source_address,
                    &agent,
                    response.status(),
                )
                .await;
            response
        }
    }
}
