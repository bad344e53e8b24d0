//! Application status aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! GET /status/{arn}
//!     → aggregator.rs (one task per probe, shared deadline)
//!         → probe.rs (HTTP provider with retries, or simulated source)
//!     → AggregatedStatus (per-probe outcome keyed by name, partial flag)
//! ```
//!
//! # Design Decisions
//! - One deadline bounds the whole fan-out, not each probe separately
//! - Results are keyed by probe name, never by completion order
//! - A probe that misses the deadline is cancelled and reported as timed out;
//!   the rest of the result is still returned

pub mod aggregator;
pub mod probe;

pub use aggregator::{aggregate, AggregatedStatus, ProbeOutcome};
pub use probe::{build_probes, HttpStatusProbe, ProbeError, SimulatedProbe, StatusProbe};
