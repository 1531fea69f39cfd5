//! Support request endpoint.
//!
//! Opens a ticket and sends the requester an acknowledgement whose subject
//! carries the correlation tag, so replies can be threaded back by the
//! inbound webhook.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use relay_core::{
    reply::{normalize_email, subject_with_tag},
    NewTicket, NewTicketMessage,
};
use serde::Deserialize;
use telemetry::metrics;
use tracing::{info, warn};

use crate::mailer::OutboundEmail;
use crate::response::{ApiError, CreateTicketResponse};
use crate::state::AppState;

/// Support request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateTicketRequest {
    /// Splits into ticket fields and the first message body.
    pub fn validate(self) -> Result<(NewTicket, String), ApiError> {
        let (Some(requester_name), Some(requester_email), Some(subject), Some(message)) = (
            present(self.requester_name),
            present(self.requester_email),
            present(self.subject),
            present(self.message),
        ) else {
            return Err(ApiError::missing_fields());
        };

        if !requester_email.contains('@') {
            return Err(ApiError::bad_request("Invalid email address"));
        }

        Ok((
            NewTicket {
                subject,
                requester_name,
                requester_email: normalize_email(&requester_email),
            },
            message,
        ))
    }
}

fn acknowledgement_body(name: &str, message: &str) -> String {
    format!(
        "Hi {},\n\nWe received your request and will get back to you soon. \
         Reply to this email to add to the conversation.\n\n> {}",
        name,
        message.replace('\n', "\n> ")
    )
}

/// POST /tickets - Open a support ticket.
pub async fn create_ticket_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateTicketResponse>), ApiError> {
    let request: CreateTicketRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let (new_ticket, message) = request.validate()?;

    let ticket = state.store.create_ticket(new_ticket).await?;
    state
        .store
        .insert_message(NewTicketMessage::from_user(
            ticket.id,
            ticket.requester_name.clone(),
            message.clone(),
        ))
        .await?;
    metrics().tickets_created.inc();

    let outbound = OutboundEmail {
        to: ticket.requester_email.clone(),
        subject: subject_with_tag(&ticket.subject, &ticket.id),
        body: acknowledgement_body(&ticket.requester_name, &message),
    };
    if let Err(e) = state.mailer.send(outbound).await {
        // The ticket exists; a lost acknowledgement does not undo it
        warn!(ticket_id = %ticket.id, error = %e, "Failed to send ticket acknowledgement");
    }

    info!(ticket_id = %ticket.id, "Opened support ticket");

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            success: true,
            ticket_id: ticket.id,
        }),
    ))
}
