//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Webhook acknowledgement.
///
/// Every outcome except malformed input is answered with 200 so the relay
/// does not retry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InboundResponse {
    pub fn threaded(ticket_id: Uuid, message_id: Uuid) -> Self {
        Self {
            success: Some(true),
            ticket_id: Some(ticket_id),
            message_id: Some(message_id),
            message: None,
        }
    }

    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            success: None,
            ticket_id: None,
            message_id: None,
            message: Some(message.into()),
        }
    }
}

/// Response for a newly opened ticket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketResponse {
    pub success: bool,
    pub ticket_id: Uuid,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub rate_limiter_connected: bool,
    pub inbound_received: u64,
    pub inbound_threaded: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn missing_fields() -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", "Missing required fields")
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_002", msg)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::PAYLOAD_TOO_LARGE, "VALID_002", msg)
    }

    pub fn rate_limited(code: impl Into<String>, msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, code),
            retry_after,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "DB_001", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        // Add Retry-After header for rate limit responses
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<relay_core::Error> for ApiError {
    fn from(err: relay_core::Error) -> Self {
        match &err {
            relay_core::Error::ValidationWithCode { code, message, .. } if *code == "VALID_001" => {
                ApiError::with_code(StatusCode::BAD_REQUEST, *code, message)
            }
            relay_core::Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            relay_core::Error::Database { code, message, http_status } => {
                let status = StatusCode::from_u16(*http_status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                ApiError::with_code(status, *code, message)
            }
            relay_core::Error::RateLimit {
                code,
                message,
                retry_after,
                ..
            } => ApiError::rate_limited(*code, message, *retry_after),
            relay_core::Error::Validation(msg) => ApiError::bad_request(msg),
            _ => ApiError::internal(err.to_string()),
        }
    }
}
