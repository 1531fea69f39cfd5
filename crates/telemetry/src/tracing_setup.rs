//! Tracing setup for structured logging.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single line output
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl LogFormat {
    /// Parses `LOG_JSON`-style flags: `1` or `true` select JSON.
    pub fn from_flag(flag: &str) -> Self {
        if flag == "1" || flag.eq_ignore_ascii_case("true") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Tracing configuration.
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "api=debug,ticket_store=debug")
    pub filter: String,
    pub format: LogFormat,
    /// Whether to include span open/close events
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            span_events: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: bool) -> Self {
        self.span_events = span_events;
        self
    }
}

/// Initialize tracing with the given configuration.
///
/// Returns false when a global subscriber was already installed, which
/// happens when several tests in one binary initialize logging.
pub fn init_tracing(config: TracingConfig) -> bool {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let installed = match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .is_ok()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_span_events(span_events)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .is_ok()
        }
    };

    if installed {
        tracing::info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    }
    installed
}

/// Initialize tracing from `RUST_LOG` and `LOG_JSON`.
pub fn init_tracing_from_env() -> bool {
    let format = std::env::var("LOG_JSON")
        .map(|v| LogFormat::from_flag(&v))
        .unwrap_or(LogFormat::Pretty);

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    init_tracing(TracingConfig::new().with_filter(filter).with_format(format))
}
