//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use citizen_gateway::audit::{AuditEntry, AuditError, AuditSink};
use citizen_gateway::config::{CounterBackend, GatewayConfig};
use citizen_gateway::http::{Components, HttpServer};
use citizen_gateway::routes::registry::Citizen;
use citizen_gateway::routes::Registry;
use citizen_gateway::security::{IdentityVerifier, MemoryWindowStore};
use citizen_gateway::status::{SimulatedProbe, StatusProbe};

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/public.pem");
pub const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/other_private.pem");

#[derive(Debug, Serialize)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: u64,
    pub iat: u64,
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

impl Claims {
    pub fn valid_for(sub: &str) -> Self {
        Self {
            sub: Some(sub.to_string()),
            exp: now_secs() + 3600,
            iat: now_secs(),
        }
    }
}

/// Sign `claims` with the test identity provider key.
pub fn sign(claims: &Claims, algorithm: Algorithm) -> String {
    let key = EncodingKey::from_rsa_pem(PRIVATE_PEM).unwrap();
    encode(&Header::new(algorithm), claims, &key).unwrap()
}

/// A valid RS256 token for `citizen`.
pub fn token_for(citizen: Uuid) -> String {
    sign(&Claims::valid_for(&citizen.to_string()), Algorithm::RS256)
}

pub fn verifier() -> IdentityVerifier {
    IdentityVerifier::from_rsa_pem(PUBLIC_PEM, 30).unwrap()
}

/// Memory counters, log-free audit, small limits.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.backend = CounterBackend::Memory;
    config.rate_limit.authenticated_limit = 100;
    config.rate_limit.anonymous_limit = 20;
    config
}

pub fn sample_citizen(id: Uuid) -> Citizen {
    let registered = Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap();
    Citizen {
        id,
        vid: "VID-4f1a9c0b22d3e7a85c61".to_string(),
        full_name: "Asha Verma".to_string(),
        date_of_birth: "1990-06-15".to_string(),
        gender: "F".to_string(),
        state: "Maharashtra".to_string(),
        district: "Pune".to_string(),
        mobile_number: "9876543210".to_string(),
        created_at: registered,
        updated_at: registered,
    }
}

pub struct TestGateway {
    pub router: Router,
    pub registry: Arc<Registry>,
}

impl TestGateway {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn gateway(
    config: &GatewayConfig,
    audit_sink: Arc<dyn AuditSink>,
    probes: Vec<Arc<dyn StatusProbe>>,
) -> TestGateway {
    let registry = Arc::new(Registry::seeded(&config.registry.citizens));
    let components = Components {
        verifier: verifier(),
        window_store: Arc::new(MemoryWindowStore::new()),
        audit_sink,
        probes,
        registry: registry.clone(),
    };
    let server = HttpServer::new(config, components).unwrap();
    TestGateway {
        router: server.router(),
        registry,
    }
}

pub fn default_gateway() -> (TestGateway, Arc<CapturingAuditSink>) {
    let sink = Arc::new(CapturingAuditSink::default());
    (gateway(&test_config(), sink.clone(), simulated_probes(&[])), sink)
}

pub fn simulated_probes(spec: &[(&str, &str, u64)]) -> Vec<Arc<dyn StatusProbe>> {
    spec.iter()
        .map(|(name, status, millis)| -> Arc<dyn StatusProbe> {
            Arc::new(SimulatedProbe::new(*name, *status, Duration::from_millis(*millis)))
        })
        .collect()
}

pub fn authed(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::USER_AGENT, "integration-test/1.0")
        .header("x-forwarded-for", "203.0.113.9");
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn anonymous(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Audit sink that keeps every entry for inspection.
#[derive(Default)]
pub struct CapturingAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl CapturingAuditSink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for CapturingAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Audit sink whose store is always down.
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("connection refused".into()))
    }
}

/// Start a programmable provider on an ephemeral port and return its address.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut request = [0u8; 4096];
                        let _ = socket.read(&mut request).await;
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
