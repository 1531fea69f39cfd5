//! Inbound email webhook.
//!
//! The mail relay posts each received email as a multipart form. Anything
//! other than a missing `from` or `subject` is answered with 200 so the relay
//! does not keep retrying.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use relay_core::error::ValidationErrorCode;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, warn};

use crate::response::{ApiError, InboundResponse};
use crate::state::AppState;
use crate::threading::{InboundEmail, ThreadingOutcome};

const PROCESSING_FAILED: &str = "Error processing email";

/// Reads the known text fields; attachments are skipped.
async fn read_form(mut multipart: Multipart) -> Result<InboundEmail, ApiError> {
    let mut email = InboundEmail::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.file_name().is_some() {
            debug!(name = ?field.name(), "Skipping attachment");
            continue;
        }

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let slot = match name.as_str() {
            "from" => &mut email.from,
            "to" => &mut email.to,
            "subject" => &mut email.subject,
            "text" => &mut email.text,
            "html" => &mut email.html,
            "envelope" => &mut email.envelope,
            _ => continue,
        };

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        *slot = Some(value);
    }

    Ok(email)
}

/// POST /inbound-email - Thread a relayed reply onto its ticket.
pub async fn inbound_email_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InboundResponse>, ApiError> {
    let start = Instant::now();
    metrics().inbound_received.inc();

    let email = match multipart {
        Ok(multipart) => read_form(multipart).await,
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
    .inspect_err(|_| metrics().inbound_rejected.inc())?;

    let result = state.processor.process(&email).await;
    metrics()
        .inbound_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    match result {
        Ok(ThreadingOutcome::Threaded {
            ticket_id,
            message_id,
            ..
        }) => {
            metrics().inbound_threaded.inc();
            Ok(Json(InboundResponse::threaded(ticket_id, message_id)))
        }
        Ok(ThreadingOutcome::Ignored(reason)) => {
            metrics().inbound_ignored.inc();
            Ok(Json(InboundResponse::acknowledged(reason.message())))
        }
        Err(e) if e.error_code() == Some(ValidationErrorCode::MissingFields.code()) => {
            metrics().inbound_rejected.inc();
            warn!(error = %e, "Rejected inbound email");
            Err(e.into())
        }
        Err(e) => {
            metrics().inbound_failed.inc();
            error!(
                error = %e,
                subject = email.subject.as_deref().unwrap_or_default(),
                "Failed to process inbound email"
            );
            Ok(Json(InboundResponse::acknowledged(PROCESSING_FAILED)))
        }
    }
}

