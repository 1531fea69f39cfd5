//! Health check aggregation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn report(&self) -> ComponentHealthReport {
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: self.message(),
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Health registry for the relay's collaborators.
pub struct HealthRegistry {
    /// Ticket store
    pub store: ComponentHealth,
    /// Rate limit counter backend
    pub rate_limiter: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            store: ComponentHealth::new("store"),
            rate_limiter: ComponentHealth::new("rate_limiter"),
        }
    }

    /// Generate a health report.
    ///
    /// The store is required for threading; a failing rate limiter backend
    /// fails open and only degrades the service.
    pub fn report(&self) -> HealthReport {
        let components = vec![self.store.report(), self.rate_limiter.report()];

        let status = if components.iter().all(|c| c.healthy) {
            HealthStatus::Healthy
        } else if self.store.is_healthy() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// Check if the service can accept traffic.
    pub fn is_ready(&self) -> bool {
        self.store.is_healthy()
    }

    /// Check if the service is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
