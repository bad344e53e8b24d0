//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared components from configuration
//! - Create the Axum router with each route's pipeline
//! - Wire up router-wide middleware (origin check, tracing, limits, request ID)
//! - Serve until the shutdown coordinator fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::audit::{AuditRecorder, AuditSink, LogAuditSink, PgAuditSink};
use crate::config::{AuditSinkKind, CounterBackend, GatewayConfig};
use crate::http::pipeline::{Pipeline, PipelineContext};
use crate::observability::metrics;
use crate::routes::{citizen, grievance, health, services, status, Registry};
use crate::security::identity::IdentityVerifier;
use crate::security::origin::cors_layer;
use crate::security::rate_limit::{QuotaEnforcer, TierLimits};
use crate::security::redaction::Redactor;
use crate::security::window_store::{MemoryWindowStore, RedisWindowStore, WindowStore};
use crate::status::{build_probes, StatusProbe};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub probes: Arc<Vec<Arc<dyn StatusProbe>>>,
    pub status_deadline: Duration,
    pub counters: Arc<dyn WindowStore>,
}

/// Externally backed collaborators the gateway is assembled from.
pub struct Components {
    pub verifier: IdentityVerifier,
    pub window_store: Arc<dyn WindowStore>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub probes: Vec<Arc<dyn StatusProbe>>,
    pub registry: Arc<Registry>,
}

impl Components {
    /// Load the verification key and connect the configured backends.
    ///
    /// # Errors
    /// Returns error if the key cannot be read or parsed, or a backend
    /// cannot be reached.
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let pem = tokio::fs::read(&config.auth.public_key_path)
            .await
            .with_context(|| format!("reading public key {}", config.auth.public_key_path))?;
        let verifier = IdentityVerifier::from_rsa_pem(&pem, config.auth.leeway_secs)
            .context("parsing RSA public key")?;

        let window_store: Arc<dyn WindowStore> = match config.rate_limit.backend {
            CounterBackend::Redis => Arc::new(
                RedisWindowStore::connect(&config.rate_limit.redis_url)
                    .await
                    .context("connecting to Redis")?,
            ),
            CounterBackend::Memory => {
                tracing::warn!("Using in-process rate-limit counters; limits are per instance");
                Arc::new(MemoryWindowStore::new())
            }
        };

        let audit_sink: Arc<dyn AuditSink> = match (&config.audit.sink, &config.audit.database_url) {
            (AuditSinkKind::Postgres, Some(url)) => {
                Arc::new(PgAuditSink::connect_lazy(url).context("configuring audit database")?)
            }
            _ => Arc::new(LogAuditSink),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.status.deadline_ms))
            .build()
            .context("building probe HTTP client")?;
        let probes = build_probes(&config.status.probes, &client);

        let registry = Registry::seeded(&config.registry.citizens);
        tracing::info!(citizens = config.registry.citizens.len(), "Citizen registry loaded");

        Ok(Self {
            verifier,
            window_store,
            audit_sink,
            probes,
            registry: Arc::new(registry),
        })
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("redaction pattern failed to compile: {0}")]
    Redaction(#[from] regex::Error),
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server with the backends named in `config`.
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let components = Components::from_config(config).await?;
        Ok(Self::new(config, components)?)
    }

    /// Create a server from already-built components.
    pub fn new(config: &GatewayConfig, components: Components) -> Result<Self, ServerError> {
        let ctx = PipelineContext {
            verifier: Arc::new(components.verifier),
            quota: Arc::new(QuotaEnforcer::new(
                components.window_store.clone(),
                TierLimits::from(&config.rate_limit),
            )),
            audit: Arc::new(AuditRecorder::new(
                components.audit_sink,
                config.audit.utc_offset_minutes,
                config.audit.mode,
            )),
            redactor: Arc::new(Redactor::new(config.redaction.max_body_bytes)?),
        };

        let state = AppState {
            registry: components.registry,
            probes: Arc::new(components.probes),
            status_deadline: Duration::from_millis(config.status.deadline_ms),
            counters: components.window_store,
        };

        let router = Self::build_router(config, &ctx, state)?;
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        ctx: &PipelineContext,
        state: AppState,
    ) -> Result<Router, ServerError> {
        let public = if config.rate_limit.limit_public_routes {
            Pipeline::public_limited()
        } else {
            Pipeline::public()
        };
        let cors = cors_layer(&config.cors).map_err(ServerError::InvalidOrigin)?;

        let profile_read = Pipeline::protected("READ", "citizen_profile");
        let profile_update = Pipeline::protected("UPDATE", "citizen_profile");
        let grievance_create = Pipeline::protected("CREATE", "grievance");
        let application_submit = Pipeline::protected("APPLY", "service_application");
        tracing::debug!(
            protected = %profile_read.describe(),
            public = %public.describe(),
            "Route pipelines"
        );

        let router = Router::new()
            .route(
                "/citizen/profile",
                profile_read.wrap(get(citizen::get_profile), ctx),
            )
            .route(
                "/citizen/profile",
                profile_update.wrap(put(citizen::update_profile), ctx),
            )
            .route(
                "/grievance",
                grievance_create.wrap(post(grievance::create_grievance), ctx),
            )
            .route(
                "/grievance/{id}",
                public.wrap(get(grievance::get_grievance), ctx),
            )
            .route("/services", public.wrap(get(services::list_services), ctx))
            .route(
                "/services/apply",
                application_submit.wrap(post(services::apply), ctx),
            )
            .route("/status/{arn}", public.wrap(get(status::get_status), ctx))
            // Health stays reachable when the counter store is down.
            .route("/health", Pipeline::public().wrap(get(health::health), ctx))
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors)
                    .layer(MapResponseBodyLayer::new(Body::new))
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.listener.request_timeout_secs,
                    ))),
            );

        Ok(router)
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Count and time every request by matched route.
async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}
