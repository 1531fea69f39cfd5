//! Test fixtures.

use axum_test::multipart::{MultipartForm, Part};
use chrono::Utc;
use relay_core::{Ticket, TicketStatus};
use uuid::Uuid;

/// Identifier used by the documented threading scenario.
pub const SCENARIO_TICKET_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

/// A ticket opened by Jane.
pub fn ticket(id: Uuid, status: TicketStatus) -> Ticket {
    let now = Utc::now();
    Ticket {
        id,
        subject: "Help".into(),
        status,
        requester_name: "Jane Requester".into(),
        requester_email: "jane@x.com".into(),
        created_at: now,
        updated_at: now,
    }
}

/// Reply subject carrying the correlation tag.
pub fn reply_subject(id: &str) -> String {
    format!("Re: Help [#{}]", id)
}

/// Webhook form with the fields the relay always sends.
pub fn inbound_form(from: &str, subject: &str, text: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("from", from)
        .add_text("to", "support@portal.example")
        .add_text("subject", subject)
        .add_text("text", text)
        .add_text("envelope", r#"{"to":["support@portal.example"]}"#)
}

/// Form with an attached file alongside the text fields.
pub fn inbound_form_with_attachment(from: &str, subject: &str, text: &str) -> MultipartForm {
    inbound_form(from, subject, text).add_part(
        "attachment1",
        Part::bytes(b"%PDF-1.4".as_slice())
            .file_name("invoice.pdf")
            .mime_type("application/pdf"),
    )
}

/// Support request body.
pub fn ticket_request(email: &str) -> serde_json::Value {
    serde_json::json!({
        "requesterName": "Jane Doe",
        "requesterEmail": email,
        "subject": "Cannot open document",
        "message": "The PDF shows a blank page."
    })
}
