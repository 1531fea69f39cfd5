//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
///
/// Checks the store and the rate limiter backend and records the result in
/// the health registry before reporting.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = state.store.is_healthy().await;
    if store_connected {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("Store check failed");
    }

    let rate_limiter_connected = state.rate_limiter.is_healthy().await;
    if rate_limiter_connected {
        health().rate_limiter.set_healthy();
    } else {
        health().rate_limiter.set_unhealthy("Rate limit backend unreachable");
    }

    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        store_connected,
        rate_limiter_connected,
        inbound_received: metrics().inbound_received.get(),
        inbound_threaded: metrics().inbound_threaded.get(),
    })
}

/// GET /health/ready - Readiness check (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness check (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
