//! Rate limiting for endpoints that send email.
//!
//! Fixed-window counters keyed by `ip:<address>` and `email:<address>`. The
//! counter backend sits behind [`RateLimitStore`] so a single instance can
//! count in memory while replicas share counters through Redis.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use relay_core::{
    error::RateLimitErrorCode,
    limits::{
        rate_limit_key, EMAIL_KEY_PREFIX, EMAIL_MAX_REQUESTS, EMAIL_WINDOW, IP_KEY_PREFIX,
        IP_MAX_REQUESTS, IP_WINDOW, MAX_RATE_LIMITED_BODY_BYTES,
    },
    reply::normalize_email,
    Error,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::{health, metrics};
use tracing::{debug, warn};

use crate::extractors::ClientIp;
use crate::response::ApiError;
use crate::state::AppState;

/// Counter backend.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Counts one request against `key` and reports whether it exceeds `ceiling`.
    ///
    /// Never fails: a backend that cannot count lets the request through.
    async fn increment(&self, key: &str, window: Duration, ceiling: u32) -> bool;

    /// Drops expired counters, returning how many were removed.
    async fn sweep(&self) -> usize;

    /// Number of live counters, when the backend can tell cheaply.
    fn live_entries(&self) -> Option<usize>;

    async fn is_healthy(&self) -> bool;
}

struct WindowCounter {
    count: u32,
    window_reset_at: Instant,
}

/// Process-local counters.
///
/// Increment and compare happen under one lock, so concurrent requests for a
/// key never over-admit. Counters do not survive a restart and are not shared
/// between replicas.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    counters: Mutex<HashMap<String, WindowCounter>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `increment` against an explicit clock.
    pub fn check_at(&self, key: &str, window: Duration, ceiling: u32, now: Instant) -> bool {
        let mut counters = self.counters.lock();

        match counters.get_mut(key) {
            Some(counter) if now < counter.window_reset_at => {
                counter.count = counter.count.saturating_add(1);
                counter.count > ceiling
            }
            _ => {
                counters.insert(
                    key.to_string(),
                    WindowCounter {
                        count: 1,
                        window_reset_at: now + window,
                    },
                );
                false
            }
        }
    }

    /// `sweep` against an explicit clock.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|_, counter| counter.window_reset_at > now);
        before - counters.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration, ceiling: u32) -> bool {
        self.check_at(key, window, ceiling, Instant::now())
    }

    async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn live_entries(&self) -> Option<usize> {
        Some(self.counters.lock().len())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Counters shared through Redis (`INCR` plus `EXPIRE` on the first hit).
pub struct RedisRateLimitStore {
    client: redis::Client,
}

impl RedisRateLimitStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Opens a client for `url`; no connection is made until first use.
    pub fn open(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::internal(format!("Invalid Redis URL: {}", e)))?;
        Ok(Self::new(client))
    }

    /// `SET NX EX` then `INCR` in one `MULTI`, so a counter never exists
    /// without its expiry.
    fn window_pipeline(redis_key: &str, window: Duration) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(redis_key)
            .arg(0)
            .arg("EX")
            .arg(window.as_secs().max(1))
            .arg("NX")
            .ignore()
            .incr(redis_key, 1);
        pipe
    }

    async fn try_increment(&self, key: &str, window: Duration) -> redis::RedisResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = format!("rate_limit:{}", key);

        let (count,): (i64,) = Self::window_pipeline(&redis_key, window)
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(&self, key: &str, window: Duration, ceiling: u32) -> bool {
        match self.try_increment(key, window).await {
            Ok(count) => count > i64::from(ceiling),
            Err(e) => {
                warn!(error = %e, key = %key, "Rate limit backend unavailable, allowing request");
                health().rate_limiter.set_unhealthy(e.to_string());
                false
            }
        }
    }

    async fn sweep(&self) -> usize {
        // Redis expires keys itself
        0
    }

    fn live_entries(&self) -> Option<usize> {
        None
    }

    async fn is_healthy(&self) -> bool {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

/// Windows and ceilings for the two classifiers.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub ip_window: Duration,
    pub ip_max_requests: u32,
    pub email_window: Duration,
    pub email_max_requests: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            ip_window: IP_WINDOW,
            ip_max_requests: IP_MAX_REQUESTS,
            email_window: EMAIL_WINDOW,
            email_max_requests: EMAIL_MAX_REQUESTS,
        }
    }
}

/// Applies the per-IP and per-email policy over a counter backend.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    /// In-memory counters with the default policy.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), RateLimitPolicy::default())
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Counts a request against `key`; true when the ceiling is exceeded.
    pub async fn check(&self, key: &str, window: Duration, max_requests: u32) -> bool {
        self.store.increment(key, window, max_requests).await
    }

    /// Checks the IP ceiling, then the email ceiling when an address is given.
    ///
    /// A request rejected by the IP check is not counted against the email.
    pub async fn check_request(&self, ip: &str, email: Option<&str>) -> Result<(), Error> {
        let ip_key = rate_limit_key(IP_KEY_PREFIX, ip);
        if self
            .check(&ip_key, self.policy.ip_window, self.policy.ip_max_requests)
            .await
        {
            return Err(Error::rate_limit(
                RateLimitErrorCode::IpExceeded,
                "Too many requests from this IP, please try again later.",
                Some(self.policy.ip_window.as_secs()),
            ));
        }

        let email = email.map(normalize_email).filter(|e| !e.is_empty());
        if let Some(email) = email {
            let email_key = rate_limit_key(EMAIL_KEY_PREFIX, &email);
            if self
                .check(
                    &email_key,
                    self.policy.email_window,
                    self.policy.email_max_requests,
                )
                .await
            {
                return Err(Error::rate_limit(
                    RateLimitErrorCode::EmailExceeded,
                    "Too many requests for this email address, please try again later.",
                    Some(self.policy.email_window.as_secs()),
                ));
            }
        }

        Ok(())
    }

    /// Drops expired counters.
    pub async fn sweep(&self) -> usize {
        let removed = self.store.sweep().await;
        if let Some(live) = self.store.live_entries() {
            metrics().rate_limit_entries.set(live as u64);
        }
        removed
    }

    pub async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await
    }
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Reads `requesterEmail` or `email` from a JSON body.
pub fn email_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;

    ["requesterEmail", "email"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Middleware for email-sending routes.
///
/// Buffers the body to find the target address, then hands the same bytes on
/// to the handler.
pub async fn limit_email_requests(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_RATE_LIMITED_BODY_BYTES)
        .await
        .map_err(|_| ApiError::payload_too_large("Request body too large"))?;

    let email = email_from_body(&bytes);

    if let Err(err) = state.rate_limiter.check_request(&ip, email.as_deref()).await {
        metrics().rate_limited_requests.inc();
        warn!(ip = %ip, path = %parts.uri.path(), error = %err, "Rate limit exceeded");
        return Err(err.into());
    }

    debug!(ip = %ip, has_email = email.is_some(), "Rate limit passed");
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
