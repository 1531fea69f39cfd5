//! Ticket store configuration.

use serde::{Deserialize, Serialize};

/// Which ticket store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, lost on restart
    Memory,
    /// Shared Postgres database
    Postgres,
}

/// Ticket store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Postgres connection URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Pool acquire timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_url() -> String {
    "postgres://localhost:5432/portal".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_url(),
            max_connections: default_max_connections(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
