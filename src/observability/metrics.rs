//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_auth_failures_total` (counter): rejected credentials by kind
//! - `gateway_rate_limited_total` (counter): quota rejections by tier
//! - `gateway_store_errors_total` (counter): counter-store failures
//! - `gateway_audit_write_failures_total` (counter): swallowed audit errors
//! - `gateway_redactions_total` (counter): masked national-ID sequences
//! - `gateway_probe_results_total` (counter): probe outcomes by source
//! - `gateway_status_duration_seconds` (histogram): aggregation latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(kind: &'static str) {
    counter!("gateway_auth_failures_total", "kind" => kind).increment(1);
}

pub fn record_rate_limited(tier: &'static str) {
    counter!("gateway_rate_limited_total", "tier" => tier).increment(1);
}

pub fn record_store_error() {
    counter!("gateway_store_errors_total").increment(1);
}

pub fn record_audit_failure() {
    counter!("gateway_audit_write_failures_total").increment(1);
}

pub fn record_redactions(count: usize) {
    counter!("gateway_redactions_total").increment(count as u64);
}

pub fn record_probe_result(probe: &str, outcome: &'static str) {
    counter!(
        "gateway_probe_results_total",
        "probe" => probe.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_status_duration(elapsed: Duration, partial: bool) {
    histogram!(
        "gateway_status_duration_seconds",
        "partial" => if partial { "true" } else { "false" }
    )
    .record(elapsed.as_secs_f64());
}
