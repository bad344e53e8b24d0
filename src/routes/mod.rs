//! Domain handlers.
//!
//! # Responsibilities
//! - Profile, grievance, scheme and status endpoints
//! - Health reporting
//!
//! # Design Decisions
//! - Handlers stay thin; authentication, quotas, audit and masking happen in
//!   the route's pipeline before a handler is reached
//! - Protected handlers take [`Identity`](crate::security::Identity) as an
//!   argument instead of reading it from untyped request state
//! - Records live in the in-memory [`Registry`]

pub mod citizen;
pub mod grievance;
pub mod health;
pub mod registry;
pub mod services;
pub mod status;

pub use registry::Registry;
