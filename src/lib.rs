//! Citizen Services API Gateway Library

pub mod audit;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routes;
pub mod security;
pub mod status;

pub use config::schema::GatewayConfig;
pub use error::AppError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
