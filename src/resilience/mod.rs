//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Status probe call to an external provider:
//!     → attempt fails (connection error or 5xx)
//!     → backoff.rs (exponential delay with jitter)
//!     → next attempt, until the probe's attempt budget is spent
//! ```
//!
//! # Design Decisions
//! - Retries live in the probe, never in the aggregator
//! - Jittered backoff prevents thundering herd
//! - Every sleep is cancellable: dropping the probe future stops the loop

pub mod backoff;
