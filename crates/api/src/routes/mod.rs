//! API routes.

pub mod health;
pub mod inbound;
pub mod tickets;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::limit_email_requests;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that cause an email to be sent
    let email_sending = Router::new()
        .route("/tickets", post(tickets::create_ticket_handler))
        .route_layer(from_fn_with_state(state.clone(), limit_email_requests));

    Router::new()
        .route(
            "/inbound-email",
            post(inbound::inbound_email_handler)
                .layer(DefaultBodyLimit::max(state.inbound_body_limit)),
        )
        .merge(email_sending)
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
