//! Application state shared across handlers.

use relay_core::Error;
use std::sync::Arc;
use std::time::Duration;
use ticket_store::TicketStore;
use tracing::{debug, info};

use crate::config::{ApiSettings, RateLimitBackend};
use crate::dedup::DeliveryGuard;
use crate::mailer::{LogMailer, Mailer};
use crate::middleware::rate_limit::{
    MemoryRateLimitStore, RateLimitStore, RateLimiter, RedisRateLimitStore, SharedRateLimiter,
};
use crate::threading::ThreadingProcessor;

/// Shortest sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Ticket store (Postgres in production, memory in tests)
    pub store: Arc<dyn TicketStore>,
    /// Inbound reply processor
    pub processor: Arc<ThreadingProcessor>,
    /// Rate limiter for email-sending routes
    pub rate_limiter: SharedRateLimiter,
    /// Outbound mail collaborator
    pub mailer: Arc<dyn Mailer>,
    /// Largest accepted webhook body
    pub inbound_body_limit: usize,
}

impl AppState {
    /// Default policy, in-memory counters, log mailer, no dedup.
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            processor: Arc::new(ThreadingProcessor::new(store.clone())),
            store,
            rate_limiter: Arc::new(RateLimiter::in_memory()),
            mailer: Arc::new(LogMailer),
            inbound_body_limit: relay_core::limits::MAX_INBOUND_BODY_BYTES,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(rate_limiter);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Drops redelivered replies seen within `ttl`.
    pub fn with_dedup(mut self, ttl: Duration) -> Self {
        self.processor = Arc::new(
            ThreadingProcessor::new(self.store.clone()).with_dedup(DeliveryGuard::new(ttl)),
        );
        self
    }

    /// Builds state from loaded settings.
    pub fn from_settings(store: Arc<dyn TicketStore>, settings: &ApiSettings) -> Result<Self, Error> {
        settings.rate_limit.validate()?;

        let counters: Arc<dyn RateLimitStore> = match settings.rate_limit.backend {
            RateLimitBackend::Memory => Arc::new(MemoryRateLimitStore::new()),
            RateLimitBackend::Redis => {
                Arc::new(RedisRateLimitStore::open(&settings.rate_limit.redis_url)?)
            }
        };

        info!(
            backend = ?settings.rate_limit.backend,
            dedup = settings.inbound.dedup_enabled,
            "Configured inbound and rate limiting"
        );

        let mut state = Self::new(store)
            .with_rate_limiter(RateLimiter::new(counters, settings.rate_limit.policy()));
        state.inbound_body_limit = settings.inbound.max_body_bytes;

        if settings.inbound.dedup_enabled {
            state = state.with_dedup(settings.inbound.dedup_ttl());
        }

        Ok(state)
    }

    /// Start the rate limiter sweep background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every.max(MIN_SWEEP_INTERVAL));
            loop {
                interval.tick().await;
                let removed = rate_limiter.sweep().await;
                debug!(removed = removed, "Swept expired rate limit counters");
            }
        })
    }
}
