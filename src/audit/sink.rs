//! Audit storage backends.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::security::identity::Identity;

/// One privileged action, as written to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub identity: Identity,
    pub action: String,
    pub resource: String,
    pub source_address: String,
    pub user_agent: String,
    /// Wall-clock time in the configured civil timezone.
    pub recorded_at: DateTime<FixedOffset>,
    /// Handler status, present only when auditing outcomes.
    pub status_code: Option<u16>,
}

impl AuditEntry {
    /// `recorded_at` as local wall-clock time, without its offset.
    pub fn wall_clock(&self) -> NaiveDateTime {
        self.recorded_at.naive_local()
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// `audit_log` table in Postgres.
///
/// `timestamp_ist` is a `timestamp without time zone` holding the civil
/// wall-clock time, so the session timezone never shifts it.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Create a sink whose pool connects on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self, AuditError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        sqlx::query(
            "INSERT INTO audit_log \
             (citizen_id, action, resource, ip_address, user_agent, timestamp_ist, status_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.identity.id())
        .bind(&entry.action)
        .bind(&entry.resource)
        .bind(&entry.source_address)
        .bind(&entry.user_agent)
        .bind(entry.wall_clock())
        .bind(entry.status_code.map(i32::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Structured log events on the `audit` target.
#[derive(Debug, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            citizen_id = %entry.identity,
            action = %entry.action,
            resource = %entry.resource,
            ip_address = %entry.source_address,
            user_agent = %entry.user_agent,
            timestamp = %entry.recorded_at.to_rfc3339(),
            status_code = ?entry.status_code,
            "Audit entry"
        );
        Ok(())
    }
}
