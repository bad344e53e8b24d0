//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, origin check, limits)
//!     → pipeline.rs (route stages: identity → quota → audit → redaction)
//!     → routes (domain handler)
//!     → Send to client
//! ```
//!
//! request.rs holds the helpers every stage shares: client address, user
//! agent and JSON payload decoding.

pub mod pipeline;
pub mod request;
pub mod server;

pub use pipeline::{Pipeline, PipelineContext, PipelineError, Stage};
pub use server::{AppState, Components, HttpServer, ServerError};
