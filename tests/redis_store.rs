//! Redis-backed window store. Requires a local Redis:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use citizen_gateway::security::{RedisWindowStore, WindowStore};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn unique_key() -> String {
    format!("ratelimit:test:{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn test_window_purges_old_events() {
    let store = RedisWindowStore::connect(&redis_url()).await.unwrap();
    let key = unique_key();
    let window = Duration::from_secs(60);
    let t0: u64 = 1_700_000_000_000_000;

    assert_eq!(store.record(&key, t0, window).await.unwrap(), 1);
    assert_eq!(store.record(&key, t0 + 1_000_000, window).await.unwrap(), 2);
    // Both earlier events fall out of the window.
    assert_eq!(store.record(&key, t0 + 62_000_000, window).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn test_same_microsecond_events_are_both_counted() {
    let store = RedisWindowStore::connect(&redis_url()).await.unwrap();
    let key = unique_key();
    let window = Duration::from_secs(60);
    let now: u64 = 1_700_000_000_000_000;

    store.record(&key, now, window).await.unwrap();
    assert_eq!(store.record(&key, now, window).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_records_see_distinct_counts() {
    let store = Arc::new(RedisWindowStore::connect(&redis_url()).await.unwrap());
    let key = unique_key();
    let now: u64 = 1_700_000_000_000_000;

    let mut handles = Vec::new();
    for i in 0..20u64 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.record(&key, now + i, Duration::from_secs(60)).await.unwrap()
        }));
    }

    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=20).collect::<Vec<u64>>());
}

#[tokio::test]
#[ignore]
async fn test_ping() {
    let store = RedisWindowStore::connect(&redis_url()).await.unwrap();
    store.ping().await.unwrap();
}
