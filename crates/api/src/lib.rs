//! HTTP API layer for the ticket relay.

pub mod config;
pub mod dedup;
pub mod extractors;
pub mod mailer;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod threading;

pub use config::ApiSettings;
pub use routes::router;
pub use state::AppState;
