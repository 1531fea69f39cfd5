//! Threads inbound email replies onto support tickets.
//!
//! The only status change made here is `resolved -> in_progress` when the
//! requester replies to a resolved ticket. Emails that cannot be matched to a
//! ticket, or that carry no new text, are ignored rather than rejected.

use relay_core::{
    error::ValidationErrorCode,
    reply::{clean_body, extract_ticket_id, has_unrecognized_tag, parse_sender},
    Error, NewTicketMessage, Result,
};
use std::sync::Arc;
use telemetry::metrics;
use ticket_store::TicketStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dedup::DeliveryGuard;

/// Fields of a relayed email.
#[derive(Debug, Clone, Default)]
pub struct InboundEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub envelope: Option<String>,
}

/// Why an email was acknowledged without creating a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoTicketId,
    TicketNotFound,
    EmptyBody,
    Duplicate,
}

impl IgnoreReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoTicketId => "No ticket ID found in subject",
            Self::TicketNotFound => "Ticket not found",
            Self::EmptyBody => "Empty message body",
            Self::Duplicate => "Duplicate delivery ignored",
        }
    }
}

/// Result of processing one inbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadingOutcome {
    Threaded {
        ticket_id: Uuid,
        message_id: Uuid,
        reopened: bool,
    },
    Ignored(IgnoreReason),
}

fn required<'a>(value: Option<&'a str>) -> Option<&'a str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Ticket threading processor.
pub struct ThreadingProcessor {
    store: Arc<dyn TicketStore>,
    dedup: Option<DeliveryGuard>,
}

impl ThreadingProcessor {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store, dedup: None }
    }

    /// Enables the redelivery guard.
    pub fn with_dedup(mut self, guard: DeliveryGuard) -> Self {
        self.dedup = Some(guard);
        self
    }

    /// Processes one relayed email.
    ///
    /// Errors are either missing `from`/`subject` (client error) or store
    /// failures. Lookup, insert, and reopen are separate store calls unless
    /// the store groups them in a transaction.
    pub async fn process(&self, email: &InboundEmail) -> Result<ThreadingOutcome> {
        let (Some(from), Some(subject)) = (
            required(email.from.as_deref()),
            required(email.subject.as_deref()),
        ) else {
            return Err(Error::validation_code(
                ValidationErrorCode::MissingFields,
                "Missing required fields",
            ));
        };

        let Some(raw_id) = extract_ticket_id(subject) else {
            if has_unrecognized_tag(subject) {
                warn!(subject = %subject, "Subject carries an unrecognized ticket tag");
            } else {
                debug!(subject = %subject, "No ticket tag in subject");
            }
            return Ok(ThreadingOutcome::Ignored(IgnoreReason::NoTicketId));
        };

        // Hex-and-hyphen tokens that are not valid UUIDs cannot name a ticket
        let Ok(ticket_id) = Uuid::parse_str(raw_id) else {
            warn!(tag = %raw_id, "Ticket tag is not a valid identifier");
            return Ok(ThreadingOutcome::Ignored(IgnoreReason::TicketNotFound));
        };

        let Some(ticket) = self.store.find_by_id(ticket_id).await? else {
            info!(ticket_id = %ticket_id, "Reply for unknown ticket ignored");
            return Ok(ThreadingOutcome::Ignored(IgnoreReason::TicketNotFound));
        };

        let sender = parse_sender(from);
        let sender_name = sender
            .name
            .unwrap_or_else(|| ticket.requester_name.clone());

        let body = clean_body(email.text.as_deref(), email.html.as_deref());
        if body.is_empty() {
            debug!(ticket_id = %ticket.id, "Reply had no new content");
            return Ok(ThreadingOutcome::Ignored(IgnoreReason::EmptyBody));
        }

        let fingerprint = self
            .dedup
            .as_ref()
            .map(|_| DeliveryGuard::fingerprint(&sender.email, subject, &body));
        if let (Some(guard), Some(fp)) = (&self.dedup, &fingerprint) {
            if !guard.reserve(fp.clone()).await {
                metrics().inbound_duplicates.inc();
                info!(ticket_id = %ticket.id, "Duplicate delivery ignored");
                return Ok(ThreadingOutcome::Ignored(IgnoreReason::Duplicate));
            }
        }

        let appended = self
            .store
            .append_user_message(
                &ticket,
                NewTicketMessage::from_user(ticket.id, sender_name, body),
            )
            .await;

        let (message, reopened) = match appended {
            Ok(appended) => appended,
            Err(e) => {
                // A failed delivery must stay retryable
                if let (Some(guard), Some(fp)) = (&self.dedup, &fingerprint) {
                    guard.release(fp).await;
                }
                return Err(e);
            }
        };

        if reopened {
            metrics().tickets_reopened.inc();
        }

        info!(
            ticket_id = %ticket.id,
            message_id = %message.id,
            sender_email = %sender.email,
            reopened = reopened,
            "Threaded inbound reply"
        );

        Ok(ThreadingOutcome::Threaded {
            ticket_id: ticket.id,
            message_id: message.id,
            reopened,
        })
    }
}
