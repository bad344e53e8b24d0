//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → origin.rs (CORS allow-list, preflight answers)
//!     → identity.rs (verify bearer token, attach Identity)
//!     → rate_limit.rs (sliding-window quota per identity or address)
//!           ↳ window_store.rs (atomic purge/insert/count in Redis or memory)
//!     → [audit, handler]
//! Outgoing response:
//!     → redaction.rs (mask national-ID numbers, fix Content-Length)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a counter-store failure is an error, never an implicit allow
//! - No trust in client input; callers only learn coarse failure kinds

pub mod identity;
pub mod origin;
pub mod rate_limit;
pub mod redaction;
pub mod window_store;

pub use identity::{AuthError, Identity, IdentityVerifier};
pub use rate_limit::{Decision, QuotaEnforcer, Subject, Tier, TierLimits};
pub use redaction::Redactor;
pub use window_store::{MemoryWindowStore, RedisWindowStore, StoreError, WindowStore};
