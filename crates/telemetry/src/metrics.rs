//! In-process metrics.
//!
//! Counters are process-local atomics read by the health endpoint and logged
//! on shutdown; nothing is exported to an external system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let bucket = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns (upper bound, count) per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the ticket relay.
#[derive(Debug, Default)]
pub struct Metrics {
    // Inbound webhook
    pub inbound_received: Counter,
    pub inbound_threaded: Counter,
    pub inbound_ignored: Counter,
    pub inbound_rejected: Counter,
    pub inbound_failed: Counter,
    pub inbound_duplicates: Counter,
    pub tickets_reopened: Counter,

    // Outbound-email endpoints
    pub tickets_created: Counter,
    pub rate_limited_requests: Counter,

    pub inbound_latency_ms: Histogram,

    /// Live rate limit counters after the last sweep
    pub rate_limit_entries: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub inbound_received: u64,
    pub inbound_threaded: u64,
    pub inbound_ignored: u64,
    pub inbound_rejected: u64,
    pub inbound_failed: u64,
    pub inbound_duplicates: u64,
    pub tickets_reopened: u64,
    pub tickets_created: u64,
    pub rate_limited_requests: u64,
    pub inbound_latency_mean_ms: f64,
    pub rate_limit_entries: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            inbound_received: self.inbound_received.get(),
            inbound_threaded: self.inbound_threaded.get(),
            inbound_ignored: self.inbound_ignored.get(),
            inbound_rejected: self.inbound_rejected.get(),
            inbound_failed: self.inbound_failed.get(),
            inbound_duplicates: self.inbound_duplicates.get(),
            tickets_reopened: self.tickets_reopened.get(),
            tickets_created: self.tickets_created.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            inbound_latency_mean_ms: self.inbound_latency_ms.mean(),
            rate_limit_entries: self.rate_limit_entries.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
