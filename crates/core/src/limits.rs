//! Rate limit policy and payload limits for the ticket relay.
//!
//! The per-IP and per-email ceilings guard every endpoint that sends email on
//! behalf of a request. Counters are fixed windows, so a burst straddling a
//! window boundary can admit up to twice the ceiling.

use std::time::Duration;

// === Rate Limit Policy ===

/// Per-IP window (15 minutes).
pub const IP_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Requests allowed per IP inside one window.
pub const IP_MAX_REQUESTS: u32 = 10;

/// Per-email window (60 minutes).
pub const EMAIL_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Requests allowed per target email address inside one window.
pub const EMAIL_MAX_REQUESTS: u32 = 5;

/// Interval of the background sweep that drops expired counters.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Key prefix for per-IP counters.
pub const IP_KEY_PREFIX: &str = "ip";

/// Key prefix for per-email counters.
pub const EMAIL_KEY_PREFIX: &str = "email";

/// Fallback key component when no client address can be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

// === Payload Limits ===

/// Maximum inbound webhook body (25MB).
///
/// Relays forward attachments in the same multipart body; they are discarded
/// but still have to be read.
pub const MAX_INBOUND_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Maximum JSON body read by the rate limit middleware (64KB).
pub const MAX_RATE_LIMITED_BODY_BYTES: usize = 64 * 1024;

// === Webhook Dedup ===

/// Default lifetime of a delivery fingerprint.
pub const DEDUP_TTL: Duration = Duration::from_secs(10 * 60);

/// Maximum remembered fingerprints.
pub const DEDUP_MAX_CAPACITY: u64 = 10_000;

/// Builds a rate limit key from a classifier prefix and an identifier.
pub fn rate_limit_key(prefix: &str, identifier: &str) -> String {
    format!("{}:{}", prefix, identifier)
}
