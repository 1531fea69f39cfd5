//! Tests for the support request endpoint.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use relay_core::{reply::extract_ticket_id, TicketStatus};
use uuid::Uuid;

/// A request opens a ticket and mails a tagged acknowledgement
#[tokio::test]
async fn test_create_ticket_sends_tagged_acknowledgement() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/tickets")
        .add_header("X-Forwarded-For", "203.0.113.50")
        .json(&fixtures::ticket_request("Jane@X.com"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);

    let ticket_id = Uuid::parse_str(body["ticketId"].as_str().unwrap()).unwrap();
    let ticket = ctx.ticket(ticket_id).await.expect("ticket should exist");
    assert_eq!(ticket.status, TicketStatus::New);
    assert_eq!(ticket.requester_email, "jane@x.com");

    let messages = ctx.messages(ticket_id).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "The PDF shows a blank page.");

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@x.com");
    let tag = ticket_id.to_string();
    assert_eq!(extract_ticket_id(&sent[0].subject), Some(tag.as_str()));
}

/// A reply to the acknowledgement threads back onto the ticket
#[tokio::test]
async fn test_acknowledgement_reply_round_trip() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let body: serde_json::Value = server
        .post("/tickets")
        .json(&fixtures::ticket_request("jane@x.com"))
        .await
        .json();
    let ticket_id = Uuid::parse_str(body["ticketId"].as_str().unwrap()).unwrap();
    let subject = format!("Re: {}", ctx.mailer.sent()[0].subject);

    server
        .post("/inbound-email")
        .multipart(fixtures::inbound_form(
            "Jane Doe <jane@x.com>",
            &subject,
            "It works now\n\n-- \nJane",
        ))
        .await
        .assert_status_ok();

    let messages = ctx.messages(ticket_id).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].body, "It works now");
}

/// Missing fields return 400
#[tokio::test]
async fn test_missing_fields_returns_400() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/tickets")
        .json(&serde_json::json!({ "requesterEmail": "jane@x.com" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(ctx.mailer.sent().is_empty());
}

/// Malformed JSON returns 400
#[tokio::test]
async fn test_invalid_json_returns_400() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/tickets")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// Store failure surfaces as 500
#[tokio::test]
async fn test_store_failure_returns_500() {
    let ctx = TestContext::new();
    ctx.set_store_failure(true);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/tickets")
        .json(&fixtures::ticket_request("jane@x.com"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_001");
}
