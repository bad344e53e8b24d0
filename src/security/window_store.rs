//! Sliding-window event logs.
//!
//! # Responsibilities
//! - Record one event for a key and report how many events remain in the window
//! - Expire events older than the window before counting
//!
//! # Design Decisions
//! - Purge, insert, count and expiry refresh form one indivisible step per key
//! - Redis: the four commands run in a single `MULTI`/`EXEC` transaction
//! - Memory: the step runs while holding the key's map shard lock; keys whose
//!   expiry has passed are swept at most once per window
//! - Timestamps are microseconds since the epoch, exact as a sorted-set score

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use thiserror::Error;

/// Failure of the shared counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unreachable: {0}")]
    Unavailable(String),

    #[error("counter store transaction failed: {0}")]
    Transaction(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Transaction(e.to_string())
        }
    }
}

/// Ordered per-key event log backing the quota enforcer.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Atomically drop events at or before `now - window`, add an event at
    /// `now`, refresh the key's expiry to `window`, and return the count.
    async fn record(&self, key: &str, now_micros: u64, window: Duration) -> Result<u64, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Redis sorted-set windows shared by every gateway instance.
#[derive(Clone)]
pub struct RedisWindowStore {
    connection: ConnectionManager,
}

impl RedisWindowStore {
    /// Connect to Redis.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn record(&self, key: &str, now_micros: u64, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection.clone();
        let window_start = now_micros.saturating_sub(window.as_micros() as u64);
        // Two requests in the same microsecond must both be counted.
        let member = format!("{now_micros}-{:08x}", rand::random::<u32>());

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(window_start)
            .ignore()
            .cmd("ZADD")
            .arg(key)
            .arg(now_micros)
            .arg(&member)
            .ignore()
            .cmd("ZCARD")
            .arg(key)
            .cmd("PEXPIRE")
            .arg(key)
            .arg(window.as_millis() as u64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Event log and expiry of one memory-store key.
#[derive(Debug, Default)]
struct KeyWindow {
    events: VecDeque<u64>,
    /// Microsecond timestamp after which the key is dropped.
    expires_at: u64,
}

/// Process-local windows for single-instance deployments.
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, KeyWindow>,
    next_sweep: AtomicU64,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every key whose expiry is at or before `now_micros`.
    pub fn purge_expired(&self, now_micros: u64) {
        self.windows.retain(|_, w| w.expires_at > now_micros);
    }

    /// Sweep expired keys if a window has passed since the last sweep.
    fn maybe_sweep(&self, now_micros: u64, window_micros: u64) {
        let due = self.next_sweep.load(Ordering::Relaxed);
        if now_micros < due {
            return;
        }
        // One caller wins the sweep; the rest carry on.
        if self
            .next_sweep
            .compare_exchange(due, now_micros + window_micros, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired(now_micros);
        }
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn record(&self, key: &str, now_micros: u64, window: Duration) -> Result<u64, StoreError> {
        let window_micros = window.as_micros() as u64;
        let window_start = now_micros.saturating_sub(window_micros);

        // Must run before the entry guard is taken: `retain` locks every shard.
        self.maybe_sweep(now_micros, window_micros);

        // The entry guard holds the shard write lock for the whole step.
        let mut entry = self.windows.entry(key.to_string()).or_default();
        entry.events.retain(|&ts| ts > window_start);
        entry.events.push_back(now_micros);
        entry.expires_at = now_micros + window_micros;
        Ok(entry.events.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_memory_store_counts_within_window() {
        let store = MemoryWindowStore::new();
        let t0 = 1_700_000_000_000_000;

        assert_eq!(store.record("k", t0, WINDOW).await.unwrap(), 1);
        assert_eq!(store.record("k", t0 + 1, WINDOW).await.unwrap(), 2);
        assert_eq!(store.record("other", t0 + 1, WINDOW).await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_purges_expired_events() {
        let store = MemoryWindowStore::new();
        let t0 = 1_700_000_000_000_000;
        let window_micros = WINDOW.as_micros() as u64;

        store.record("k", t0, WINDOW).await.unwrap();
        store.record("k", t0 + 10, WINDOW).await.unwrap();

        // Exactly one window later the first event is expired.
        assert_eq!(store.record("k", t0 + window_micros, WINDOW).await.unwrap(), 2);
        assert_eq!(
            store.record("k", t0 + 2 * window_micros + 1, WINDOW).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_memory_store_drops_idle_keys() {
        let store = MemoryWindowStore::new();
        let t0 = 1_700_000_000_000_000;
        let window_micros = WINDOW.as_micros() as u64;

        for i in 0..50 {
            let key = format!("ratelimit:anon:10.0.0.{i}");
            store.record(&key, t0, WINDOW).await.unwrap();
        }
        assert_eq!(store.len(), 50);

        // Still inside the window: nothing is swept yet.
        store.record("active", t0 + window_micros / 2, WINDOW).await.unwrap();
        assert_eq!(store.len(), 51);

        store.record("active", t0 + window_micros + 1, WINDOW).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.record("active", t0 + window_micros + 2, WINDOW).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_refreshed_keys() {
        let store = MemoryWindowStore::new();
        let t0 = 1_700_000_000_000_000;
        let window_micros = WINDOW.as_micros() as u64;

        store.record("idle", t0, WINDOW).await.unwrap();
        store.record("busy", t0, WINDOW).await.unwrap();
        store.record("busy", t0 + window_micros / 2, WINDOW).await.unwrap();

        store.purge_expired(t0 + window_micros);
        assert_eq!(store.len(), 1);
        assert_eq!(store.record("busy", t0 + window_micros, WINDOW).await.unwrap(), 2);
    }
}
