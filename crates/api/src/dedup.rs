//! Short-lived memory of webhook deliveries.
//!
//! Relays redeliver on timeouts. When enabled, a reply whose sender, subject,
//! and cleaned body match one threaded within the TTL is acknowledged without
//! creating a second message.

use moka::future::Cache;
use relay_core::limits::DEDUP_MAX_CAPACITY;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Fingerprint cache for threaded deliveries.
#[derive(Clone)]
pub struct DeliveryGuard {
    seen: Cache<String, ()>,
}

impl DeliveryGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(DEDUP_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// SHA-256 over the fields, NUL separated.
    pub fn fingerprint(from: &str, subject: &str, body: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [from, subject, body] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Claims a fingerprint for one delivery.
    ///
    /// Returns false when another delivery already holds it within the TTL.
    /// The insert and the check are one cache operation, so concurrent
    /// redeliveries cannot both claim the same fingerprint.
    pub async fn reserve(&self, fingerprint: String) -> bool {
        self.seen.entry(fingerprint).or_insert(()).await.is_fresh()
    }

    /// Releases a fingerprint whose delivery was not threaded.
    pub async fn release(&self, fingerprint: &str) {
        self.seen.invalidate(fingerprint).await;
    }
}
