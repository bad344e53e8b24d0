//! Citizen Services API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ origin check (CORS)
//!                        │
//!                        ▼
//!                   ┌──────────┐   ┌─────────┐   ┌─────────┐   ┌───────────┐
//!                   │ identity │──▶│  quota  │──▶│  audit  │──▶│ redaction │──▶ handler
//!                   │  (JWT)   │   │ (Redis) │   │  (PG)   │   │ (buffer)  │      │
//!                   └──────────┘   └─────────┘   └─────────┘   └───────────┘      │
//!                                                                                 ▼
//!                                               GET /status/{arn} → status aggregator
//!                                                                  ├─ probe PM-KISAN
//!                                                                  ├─ probe PFMS
//!                                                                  └─ probe STATE
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use citizen_gateway::config::load_config;
use citizen_gateway::lifecycle::signals::spawn_signal_handler;
use citizen_gateway::observability::{logging, metrics};
use citizen_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "citizen-gateway")]
#[command(about = "API gateway for citizen services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    logging::init(&config.observability).context("initializing logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "citizen-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        counter_backend = ?config.rate_limit.backend,
        audit_sink = ?config.audit.sink,
        audit_mode = ?config.audit.mode,
        probes = config.status.probes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::from_config(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("binding {}", config.listener.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(
        shutdown.clone(),
        Duration::from_secs(config.shutdown.grace_secs),
    );

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
