//! Tests for rate limiting on email-sending endpoints.

use api::middleware::rate_limit::RateLimitPolicy;
use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use std::time::Duration;

/// The 11th request from one IP within the window is rejected
#[tokio::test]
async fn test_ip_ceiling_returns_429() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Distinct addresses keep the per-email ceiling out of the way
    for i in 0..10 {
        server
            .post("/tickets")
            .add_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .json(&fixtures::ticket_request(&format!("user{}@x.com", i)))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .post("/tickets")
        .add_header("X-Forwarded-For", "203.0.113.7")
        .json(&fixtures::ticket_request("another@x.com"))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RATE_001");
    assert_eq!(
        body["error"],
        "Too many requests from this IP, please try again later."
    );
    assert_eq!(response.header("Retry-After"), "900");

    // A different client is unaffected
    server
        .post("/tickets")
        .add_header("X-Forwarded-For", "203.0.113.8")
        .json(&fixtures::ticket_request("another@x.com"))
        .await
        .assert_status(StatusCode::CREATED);
}

/// The 6th request for one address within the window is rejected
#[tokio::test]
async fn test_email_ceiling_returns_429() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for i in 0..5 {
        server
            .post("/tickets")
            .add_header("X-Forwarded-For", format!("192.0.2.{}", i))
            .json(&fixtures::ticket_request("Jane@X.com"))
            .await
            .assert_status(StatusCode::CREATED);
    }

    // Case differences do not escape the email counter
    let response = server
        .post("/tickets")
        .add_header("X-Forwarded-For", "192.0.2.99")
        .json(&fixtures::ticket_request("jane@x.com"))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RATE_002");
    assert_eq!(response.header("Retry-After"), "3600");
}

/// Rejected requests do not create tickets or send mail
#[tokio::test]
async fn test_rejected_request_has_no_side_effects() {
    let ctx = TestContext::with_policy(RateLimitPolicy {
        ip_window: Duration::from_secs(60),
        ip_max_requests: 1,
        email_window: Duration::from_secs(60),
        email_max_requests: 1,
    });
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/tickets")
        .add_header("X-Real-IP", "198.51.100.1")
        .json(&fixtures::ticket_request("jane@x.com"))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .post("/tickets")
        .add_header("X-Real-IP", "198.51.100.1")
        .json(&fixtures::ticket_request("jane@x.com"))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(ctx.mailer.sent().len(), 1);
}

/// Requests without any client address share the `unknown` bucket
#[tokio::test]
async fn test_unresolved_clients_share_bucket() {
    let ctx = TestContext::with_policy(RateLimitPolicy {
        ip_max_requests: 2,
        ..RateLimitPolicy::default()
    });
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for i in 0..2 {
        server
            .post("/tickets")
            .json(&fixtures::ticket_request(&format!("u{}@x.com", i)))
            .await
            .assert_status(StatusCode::CREATED);
    }

    server
        .post("/tickets")
        .json(&fixtures::ticket_request("u9@x.com"))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}
