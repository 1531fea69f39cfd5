//! Ticket Relay
//!
//! Inbound communication service for the document portal:
//! - Threads emailed replies onto support tickets via the mail relay webhook
//! - Rate limits endpoints that send email, per client IP and per address
//! - Opens support tickets whose acknowledgements carry a correlation tag

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::config::{InboundSettings, RateLimitBackend, RateLimitSettings};
use api::{router, ApiSettings, AppState};
use telemetry::{health, init_tracing_from_env, metrics};
use ticket_store::{MemoryStore, PgTicketStore, StoreBackend, StoreConfig, TicketStore};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    rate_limit: RateLimitSettings,

    #[serde(default)]
    inbound: InboundSettings,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: StoreConfig::default(),
            rate_limit: RateLimitSettings::default(),
            inbound: InboundSettings::default(),
        }
    }
}

impl Config {
    fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            rate_limit: self.rate_limit.clone(),
            inbound: self.inbound.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Ticket Relay v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        store = ?config.store.backend,
        rate_limit = ?config.rate_limit.backend,
        dedup = config.inbound.dedup_enabled,
        "Loaded configuration"
    );

    let store = open_store(&config.store).await?;

    let state = AppState::from_settings(store.clone(), &config.api_settings())
        .context("Failed to build application state")?;

    check_health(&state).await;

    // Start rate limiter sweep background task
    let _rate_limiter_cleanup =
        state.start_rate_limiter_cleanup(config.rate_limit.sweep_interval());
    info!(
        every_secs = config.rate_limit.sweep_interval_secs,
        "Started rate limiter sweep task"
    );

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down...");

    let snapshot = metrics().snapshot();
    info!(
        inbound_received = snapshot.inbound_received,
        inbound_threaded = snapshot.inbound_threaded,
        inbound_ignored = snapshot.inbound_ignored,
        inbound_failed = snapshot.inbound_failed,
        tickets_reopened = snapshot.tickets_reopened,
        rate_limited_requests = snapshot.rate_limited_requests,
        "Final metrics"
    );

    info!("Shutdown complete");
    Ok(())
}

/// Opens the configured ticket store.
async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TicketStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory ticket store; tickets are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgTicketStore::connect(config)
                .await
                .context("Failed to connect to Postgres")?;

            if let Err(e) = ticket_store::health::init_schema(store.pool()).await {
                error!("Failed to initialize ticket schema: {}", e);
                // Continue anyway - schema might already exist
            }

            Ok(Arc::new(store))
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("RELAY")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("RELAY_DATABASE_URL") {
        config.store.url = url;
    }
    if let Ok(backend) = std::env::var("RELAY_STORE_BACKEND") {
        config.store.backend = match backend.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown store backend: {}", other),
        };
    }
    if let Ok(url) = std::env::var("RELAY_REDIS_URL") {
        config.rate_limit.redis_url = url;
    }
    if let Ok(backend) = std::env::var("RELAY_RATE_LIMIT_BACKEND") {
        config.rate_limit.backend = match backend.to_lowercase().as_str() {
            "redis" => RateLimitBackend::Redis,
            "memory" => RateLimitBackend::Memory,
            other => anyhow::bail!("Unknown rate limit backend: {}", other),
        };
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(state: &AppState) {
    if state.store.is_healthy().await {
        health().store.set_healthy();
        info!("Ticket store: healthy");
    } else {
        health().store.set_unhealthy("Connection failed");
        error!("Ticket store: unhealthy");
    }

    if state.rate_limiter.is_healthy().await {
        health().rate_limiter.set_healthy();
        info!("Rate limit backend: healthy");
    } else {
        // Requests fail open while the backend is down
        health().rate_limiter.set_unhealthy("Connection failed");
        warn!("Rate limit backend: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
