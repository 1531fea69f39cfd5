//! HTTP layer configuration.

use relay_core::limits::{
    DEDUP_TTL, EMAIL_MAX_REQUESTS, EMAIL_WINDOW, IP_MAX_REQUESTS, IP_WINDOW,
    MAX_INBOUND_BODY_BYTES, SWEEP_INTERVAL,
};
use relay_core::{error::ValidationErrorCode, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::middleware::rate_limit::RateLimitPolicy;

/// Where rate limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Per-process counters
    Memory,
    /// Counters shared between replicas
    Redis,
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_backend")]
    pub backend: RateLimitBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_ip_window_secs")]
    pub ip_window_secs: u64,
    #[serde(default = "default_ip_max_requests")]
    pub ip_max_requests: u32,
    #[serde(default = "default_email_window_secs")]
    pub email_window_secs: u64,
    #[serde(default = "default_email_max_requests")]
    pub email_max_requests: u32,
    /// Seconds between sweeps of expired counters
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_backend() -> RateLimitBackend {
    RateLimitBackend::Memory
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_ip_window_secs() -> u64 {
    IP_WINDOW.as_secs()
}

fn default_ip_max_requests() -> u32 {
    IP_MAX_REQUESTS
}

fn default_email_window_secs() -> u64 {
    EMAIL_WINDOW.as_secs()
}

fn default_email_max_requests() -> u32 {
    EMAIL_MAX_REQUESTS
}

fn default_sweep_interval_secs() -> u64 {
    SWEEP_INTERVAL.as_secs()
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            ip_window_secs: default_ip_window_secs(),
            ip_max_requests: default_ip_max_requests(),
            email_window_secs: default_email_window_secs(),
            email_max_requests: default_email_max_requests(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RateLimitSettings {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            ip_window: Duration::from_secs(self.ip_window_secs),
            ip_max_requests: self.ip_max_requests,
            email_window: Duration::from_secs(self.email_window_secs),
            email_max_requests: self.email_max_requests,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Windows and the sweep interval must be at least one second.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, secs) in [
            ("ip_window_secs", self.ip_window_secs),
            ("email_window_secs", self.email_window_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ] {
            if secs == 0 {
                return Err(Error::validation_code(
                    ValidationErrorCode::InvalidPayload,
                    format!("rate_limit.{} must be greater than zero", name),
                ));
            }
        }
        Ok(())
    }
}

/// Inbound webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundSettings {
    /// Drop redeliveries of an already threaded reply
    #[serde(default)]
    pub dedup_enabled: bool,
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_dedup_ttl_secs() -> u64 {
    DEDUP_TTL.as_secs()
}

fn default_max_body_bytes() -> usize {
    MAX_INBOUND_BODY_BYTES
}

impl Default for InboundSettings {
    fn default() -> Self {
        Self {
            dedup_enabled: false,
            dedup_ttl_secs: default_dedup_ttl_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl InboundSettings {
    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }
}

/// Settings consumed by [`crate::AppState::from_settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub inbound: InboundSettings,
}
