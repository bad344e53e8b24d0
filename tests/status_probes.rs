//! HTTP status probes against programmable providers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use citizen_gateway::status::{aggregate, HttpStatusProbe, ProbeError, ProbeOutcome, StatusProbe};

mod common;

fn probe(name: &str, addr: std::net::SocketAddr) -> HttpStatusProbe {
    HttpStatusProbe::new(
        name,
        format!("http://{addr}/applications/{{arn}}/status"),
        reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap(),
    )
    .with_retries(3, Duration::from_millis(10), Duration::from_millis(50))
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, r#"{"error":"busy"}"#.into())
            } else {
                (200, r#"{"status":"Disbursed"}"#.into())
            }
        }
    })
    .await;

    let status = probe("PFMS", addr).fetch("ARN-PMK-000001").await.unwrap();
    assert_eq!(status, "Disbursed");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_are_upstream_unavailable() {
    let addr = common::start_programmable_backend(|| async { (502, String::new()) }).await;

    match probe("STATE", addr).fetch("ARN-PMK-000002").await {
        Err(ProbeError::UpstreamUnavailable { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (404, r#"{"error":"unknown arn"}"#.into())
        }
    })
    .await;

    let err = probe("PM-KISAN", addr).fetch("ARN-X").await.unwrap_err();
    assert!(matches!(err, ProbeError::BadResponse(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_provider_is_reported_beside_healthy_ones() {
    let healthy = common::start_programmable_backend(|| async {
        (200, r#"{"status":"Approved"}"#.into())
    })
    .await;
    let broken = common::start_programmable_backend(|| async { (500, String::new()) }).await;

    let probes: Vec<Arc<dyn StatusProbe>> = vec![
        Arc::new(probe("STATE", healthy)),
        Arc::new(probe("PFMS", broken)),
    ];
    let result = aggregate(
        "ARN-PMAY-000007",
        &probes,
        Instant::now() + Duration::from_secs(5),
    )
    .await;

    assert!(!result.partial);
    assert_eq!(
        result.sources["STATE"],
        ProbeOutcome::Completed {
            status: "Approved".into()
        }
    );
    assert!(matches!(result.sources["PFMS"], ProbeOutcome::Failed { .. }));
}
