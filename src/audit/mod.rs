//! Audit trail subsystem.
//!
//! # Data Flow
//! ```text
//! Protected request with an Identity:
//!     → recorder.rs (build entry: identity, action, resource, address, agent, time)
//!     → sink.rs (Postgres audit_log table, or structured log events)
//! ```
//!
//! # Design Decisions
//! - Best effort: a failed write is logged and counted, never surfaced
//! - Default mode records intent before the handler runs; `outcome` mode
//!   records after the handler with the response status
//! - Unauthenticated requests are not audited
//! - Entries are append-only; nothing here updates or deletes them

pub mod recorder;
pub mod sink;

pub use recorder::{audit_middleware, AuditRecorder, AuditStage};
pub use sink::{AuditEntry, AuditError, AuditSink, LogAuditSink, PgAuditSink};
