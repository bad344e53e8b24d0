//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Bearer credential verification.
    pub auth: AuthConfig,

    /// Sliding-window quota settings.
    pub rate_limit: RateLimitConfig,

    /// Audit trail settings.
    pub audit: AuditConfig,

    /// Allowed browser origins.
    pub cors: CorsConfig,

    /// Multi-source status aggregation.
    pub status: StatusConfig,

    /// Response redaction settings.
    pub redaction: RedactionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Records loaded into the citizen registry at startup.
    pub registry: RegistryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Bearer credential verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path to the RSA public key (PEM) that signs citizen tokens.
    pub public_key_path: String,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_key_path: "keys/jwt_public.pem".to_string(),
            leeway_secs: 30,
        }
    }
}

/// Where the rate-limit windows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterBackend {
    /// Shared Redis sorted sets (multi-instance deployments).
    Redis,
    /// Process-local windows (single instance, development).
    Memory,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub backend: CounterBackend,

    /// Redis connection URL, used by the `redis` backend.
    pub redis_url: String,

    /// Requests per window for callers with a verified identity.
    pub authenticated_limit: u64,

    /// Requests per window for callers keyed by source address.
    pub anonymous_limit: u64,

    /// Window length in seconds, shared by both tiers.
    pub window_secs: u64,

    /// Apply the anonymous tier to public routes (except `/health`).
    pub limit_public_routes: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: CounterBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            authenticated_limit: 100,
            anonymous_limit: 20,
            window_secs: 60,
            limit_public_routes: false,
        }
    }
}

/// Destination of audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// `audit_log` table in Postgres.
    Postgres,
    /// Structured log events on the `audit` target.
    Log,
}

/// When the audit entry is written relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Before the handler runs: records the attempted action.
    Intent,
    /// After the handler returns: records the action with its status code.
    Outcome,
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub sink: AuditSinkKind,

    /// Postgres URL, used by the `postgres` sink.
    pub database_url: Option<String>,

    /// Civil timezone of recorded timestamps, minutes east of UTC.
    pub utc_offset_minutes: i32,

    pub mode: AuditMode,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::Log,
            database_url: None,
            // Asia/Kolkata
            utc_offset_minutes: 330,
            mode: AuditMode::Intent,
        }
    }
}

/// Browser origin allow-list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_age_secs: 300,
        }
    }
}

/// How a status probe reaches its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// GET against `url` with `{arn}` substituted.
    Http,
    /// Fixed answer after `latency_ms` (sources without a live API).
    Simulated,
}

/// A single status source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Unique source name; keys the aggregated result.
    pub name: String,

    pub kind: ProbeKind,

    /// URL template, required for `http` probes.
    #[serde(default)]
    pub url: Option<String>,

    /// Answer of a `simulated` probe.
    #[serde(default)]
    pub status: Option<String>,

    /// Latency of a `simulated` probe in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,

    /// Attempts before the source is reported unavailable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    1000
}

impl ProbeConfig {
    fn simulated(name: &str, status: &str, latency_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            kind: ProbeKind::Simulated,
            url: None,
            status: Some(status.to_string()),
            latency_ms,
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Status aggregation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Shared deadline for all probes of one request, in milliseconds.
    pub deadline_ms: u64,

    pub probes: Vec<ProbeConfig>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 5000,
            probes: vec![
                ProbeConfig::simulated("PM-KISAN", "Received", 1000),
                ProbeConfig::simulated("PFMS", "Pending", 2000),
                ProbeConfig::simulated("STATE", "Approved", 1000),
            ],
        }
    }
}

/// Response redaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Largest handler body buffered for redaction, in bytes.
    pub max_body_bytes: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for in-flight requests to drain before a forced exit.
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 30 }
    }
}

/// A citizen record loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CitizenSeed {
    pub id: Uuid,

    /// Tokenized national ID.
    pub vid: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub state: String,
    pub district: String,

    #[serde(default)]
    pub mobile_number: String,
}

/// Citizen registry contents.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub citizens: Vec<CitizenSeed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            backend = "memory"
            authenticated_limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.backend, CounterBackend::Memory);
        assert_eq!(config.rate_limit.authenticated_limit, 5);
        assert_eq!(config.rate_limit.anonymous_limit, 20);
        assert_eq!(config.audit.utc_offset_minutes, 330);
        assert_eq!(config.status.probes.len(), 3);
    }

    #[test]
    fn test_probe_table_parses() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [status]
            deadline_ms = 2500

            [[status.probes]]
            name = "PM-KISAN"
            kind = "http"
            url = "http://pmkisan.internal/status/{arn}"
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.status.deadline_ms, 2500);
        let probe = &config.status.probes[0];
        assert_eq!(probe.kind, ProbeKind::Http);
        assert_eq!(probe.max_attempts, 2);
        assert_eq!(probe.base_delay_ms, 100);
    }

    #[test]
    fn test_citizen_seeds_parse() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[registry.citizens]]
            id = "7d1f6a52-3c1e-4b8e-9a51-0f5a2b8c9d10"
            vid = "VID-0001"
            full_name = "Asha Verma"
            date_of_birth = "1990-04-12"
            gender = "F"
            state = "Rajasthan"
            district = "Jaipur"
            "#,
        )
        .unwrap();

        let seed = &config.registry.citizens[0];
        assert_eq!(seed.id.to_string(), "7d1f6a52-3c1e-4b8e-9a51-0f5a2b8c9d10");
        assert_eq!(seed.district, "Jaipur");
        assert!(seed.mobile_number.is_empty());
    }
}
