//! Status sources queried by the aggregator.
//!
//! # Responsibilities
//! - Define the probe contract: a name plus `fetch(reference) -> status`
//! - HTTP probes with per-probe retry and jittered backoff
//! - Simulated probes for sources without a live integration
//!
//! # Design Decisions
//! - Retries belong to the probe; the aggregator never retries
//! - Connection errors and 5xx are retried, other statuses fail at once
//! - Dropping the fetch future cancels any in-flight request or backoff sleep

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ProbeConfig, ProbeKind};
use crate::resilience::backoff::backoff_delay;

/// Why a status source failed to answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("upstream unavailable after {attempts} attempts: {reason}")]
    UpstreamUnavailable { attempts: u32, reason: String },

    #[error("unexpected upstream response: {0}")]
    BadResponse(String),
}

/// One independent status source.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Unique name; keys the probe's slot in the aggregated result.
    fn name(&self) -> &str;

    /// Look up the status of `reference` at this source.
    async fn fetch(&self, reference: &str) -> Result<String, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

/// Queries a provider endpoint, `{arn}` substituted into the URL template.
pub struct HttpStatusProbe {
    name: String,
    url_template: String,
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl HttpStatusProbe {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            client,
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retries(mut self, max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    fn url(&self, reference: &str) -> String {
        self.url_template.replace("{arn}", reference)
    }

    /// One request; `Err(true)` marks a retryable failure.
    async fn attempt(&self, url: &str) -> Result<String, (bool, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| (true, e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err((true, format!("status {status}")));
        }
        if !status.is_success() {
            return Err((false, format!("status {status}")));
        }

        response
            .json::<StatusBody>()
            .await
            .map(|body| body.status)
            .map_err(|e| (false, e.to_string()))
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, reference: &str) -> Result<String, ProbeError> {
        let url = self.url(reference);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.attempt(&url).await {
                Ok(status) => return Ok(status),
                Err((false, reason)) => return Err(ProbeError::BadResponse(reason)),
                Err((true, reason)) if attempts >= self.max_attempts => {
                    return Err(ProbeError::UpstreamUnavailable { attempts, reason });
                }
                Err((true, reason)) => {
                    let delay = backoff_delay(attempts, self.base_delay, self.max_delay);
                    tracing::warn!(
                        probe = %self.name,
                        attempt = attempts,
                        delay = ?delay,
                        error = %reason,
                        "Status probe failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Answers with a fixed status after a fixed latency.
pub struct SimulatedProbe {
    name: String,
    status: String,
    latency: Duration,
}

impl SimulatedProbe {
    pub fn new(name: impl Into<String>, status: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            latency,
        }
    }
}

#[async_trait]
impl StatusProbe for SimulatedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _reference: &str) -> Result<String, ProbeError> {
        tokio::time::sleep(self.latency).await;
        Ok(self.status.clone())
    }
}

/// Instantiate the configured probes; HTTP probes share one client.
pub fn build_probes(configs: &[ProbeConfig], client: &reqwest::Client) -> Vec<Arc<dyn StatusProbe>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn StatusProbe> {
            match config.kind {
                ProbeKind::Http => Arc::new(
                    HttpStatusProbe::new(
                        config.name.clone(),
                        config.url.clone().unwrap_or_default(),
                        client.clone(),
                    )
                    .with_retries(
                        config.max_attempts,
                        Duration::from_millis(config.base_delay_ms),
                        Duration::from_millis(config.max_delay_ms),
                    ),
                ),
                ProbeKind::Simulated => Arc::new(SimulatedProbe::new(
                    config.name.clone(),
                    config.status.clone().unwrap_or_default(),
                    Duration::from_millis(config.latency_ms),
                )),
            }
        })
        .collect()
}
