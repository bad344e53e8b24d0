//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits, windows and deadlines > 0)
//! - Keep the status deadline inside the request timeout
//! - Check that each selected backend has its connection settings
//! - Detect duplicate probe names and citizen ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AuditSinkKind, CounterBackend, GatewayConfig, ProbeKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address",
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if config.auth.public_key_path.trim().is_empty() {
        errors.push(ValidationError::new("auth.public_key_path", "is required"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.authenticated_limit == 0 {
        errors.push(ValidationError::new("rate_limit.authenticated_limit", "must be > 0"));
    }
    if rate_limit.anonymous_limit == 0 {
        errors.push(ValidationError::new("rate_limit.anonymous_limit", "must be > 0"));
    }
    if rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if rate_limit.backend == CounterBackend::Redis && rate_limit.redis_url.trim().is_empty() {
        errors.push(ValidationError::new(
            "rate_limit.redis_url",
            "is required for the redis backend",
        ));
    }

    let audit = &config.audit;
    if audit.sink == AuditSinkKind::Postgres
        && audit.database_url.as_deref().map_or(true, |url| url.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "audit.database_url",
            "is required for the postgres sink",
        ));
    }
    // chrono accepts offsets strictly inside one day
    if audit.utc_offset_minutes.abs() >= 24 * 60 {
        errors.push(ValidationError::new(
            "audit.utc_offset_minutes",
            "must be within (-1440, 1440)",
        ));
    }

    if config.status.deadline_ms == 0 {
        errors.push(ValidationError::new("status.deadline_ms", "must be > 0"));
    } else if config.status.deadline_ms >= config.listener.request_timeout_secs.saturating_mul(1000) {
        // Otherwise the request timeout answers before the partial result.
        errors.push(ValidationError::new(
            "status.deadline_ms",
            "must be shorter than listener.request_timeout_secs",
        ));
    }
    let mut names = HashSet::new();
    for (i, probe) in config.status.probes.iter().enumerate() {
        let field = |name: &str| format!("status.probes[{i}].{name}");
        if probe.name.trim().is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        } else if !names.insert(probe.name.as_str()) {
            errors.push(ValidationError::new(
                field("name"),
                format!("duplicate probe name '{}'", probe.name),
            ));
        }
        if probe.max_attempts == 0 {
            errors.push(ValidationError::new(field("max_attempts"), "must be > 0"));
        }
        match probe.kind {
            ProbeKind::Http => match probe.url.as_deref() {
                Some(url) if url.contains("{arn}") => {}
                Some(_) => errors.push(ValidationError::new(
                    field("url"),
                    "must contain the {arn} placeholder",
                )),
                None => errors.push(ValidationError::new(
                    field("url"),
                    "is required for http probes",
                )),
            },
            ProbeKind::Simulated => {
                if probe.status.is_none() {
                    errors.push(ValidationError::new(
                        field("status"),
                        "is required for simulated probes",
                    ));
                }
            }
        }
    }

    let mut citizen_ids = HashSet::new();
    for (i, seed) in config.registry.citizens.iter().enumerate() {
        if !citizen_ids.insert(seed.id) {
            errors.push(ValidationError::new(
                format!("registry.citizens[{i}].id"),
                format!("duplicate citizen id '{}'", seed.id),
            ));
        }
    }

    if config.redaction.max_body_bytes == 0 {
        errors.push(ValidationError::new("redaction.max_body_bytes", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
