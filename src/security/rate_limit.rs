//! Sliding-window rate limiting with two tiers.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::http::request::client_address;
use crate::observability::metrics;
use crate::security::identity::Identity;
use crate::security::window_store::{StoreError, WindowStore};

/// Rate-limit class of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Authenticated,
    Anonymous,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Authenticated => "auth",
            Tier::Anonymous => "anon",
        }
    }
}

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Identity(Identity),
    Address(String),
}

impl Subject {
    pub fn tier(&self) -> Tier {
        match self {
            Subject::Identity(_) => Tier::Authenticated,
            Subject::Address(_) => Tier::Anonymous,
        }
    }

    /// Counter key, e.g. `ratelimit:auth:<uuid>` or `ratelimit:anon:<address>`.
    pub fn key(&self) -> String {
        match self {
            Subject::Identity(id) => format!("ratelimit:auth:{id}"),
            Subject::Address(addr) => format!("ratelimit:anon:{addr}"),
        }
    }
}

/// Per-tier limits over one shared window.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    pub authenticated: u64,
    pub anonymous: u64,
    pub window: Duration,
}

impl TierLimits {
    pub fn limit(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Authenticated => self.authenticated,
            Tier::Anonymous => self.anonymous,
        }
    }
}

impl From<&RateLimitConfig> for TierLimits {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            authenticated: config.authenticated_limit,
            anonymous: config.anonymous_limit,
            window: Duration::from_secs(config.window_secs),
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow { count: u64, limit: u64 },
    Reject { retry_after: Duration },
}

/// Sliding-window log limiter over a shared [`WindowStore`].
pub struct QuotaEnforcer {
    store: Arc<dyn WindowStore>,
    limits: TierLimits,
}

impl QuotaEnforcer {
    pub fn new(store: Arc<dyn WindowStore>, limits: TierLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> TierLimits {
        self.limits
    }

    /// Count this request against `subject` using the wall clock.
    pub async fn check(&self, subject: &Subject) -> Result<Decision, StoreError> {
        self.check_at(subject, SystemTime::now()).await
    }

    /// Count this request against `subject` as if it arrived at `now`.
    pub async fn check_at(&self, subject: &Subject, now: SystemTime) -> Result<Decision, StoreError> {
        let now_micros = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        let limit = self.limits.limit(subject.tier());

        let count = self
            .store
            .record(&subject.key(), now_micros, self.limits.window)
            .await?;

        if count > limit {
            Ok(Decision::Reject {
                retry_after: self.limits.window,
            })
        } else {
            Ok(Decision::Allow { count, limit })
        }
    }
}

/// Quota stage: count the request against the caller's identity or address.
pub async fn quota_middleware(
    State(enforcer): State<Arc<QuotaEnforcer>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let subject = match request.extensions().get::<Identity>() {
        Some(identity) => Subject::Identity(*identity),
        None => Subject::Address(client_address(&request)),
    };
    let tier = subject.tier();

    match enforcer.check(&subject).await {
        Ok(Decision::Allow { count, limit }) => {
            tracing::trace!(tier = tier.as_str(), count, limit, "Quota check passed");
            next.run(request).await
        }
        Ok(Decision::Reject { retry_after }) => {
            tracing::warn!(tier = tier.as_str(), key = %subject.key(), "Rate limit exceeded");
            metrics::record_rate_limited(tier.as_str());
            AppError::RateLimited { retry_after }.into_response()
        }
        Err(e) => {
            metrics::record_store_error();
            AppError::StoreUnavailable(e.to_string()).into_response()
        }
    }
}
