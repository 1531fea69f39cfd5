//! Unified error types for the ticket relay.
//!
//! Error codes:
//! - VALID_001-002: Validation errors
//! - DB_001-002: Ticket store errors
//! - RATE_001-002: Rate limit errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: A required field is missing or blank
    MissingFields,
    /// VALID_002: Payload could not be decoded
    InvalidPayload,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "VALID_001",
            Self::InvalidPayload => "VALID_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Ticket store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Store operation failed
    StoreFailed,
    /// DB_002: Referenced row does not exist
    NotFound,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreFailed => "DB_001",
            Self::NotFound => "DB_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::StoreFailed => 500,
            Self::NotFound => 404,
        }
    }
}

/// Rate limit error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitErrorCode {
    /// RATE_001: Too many requests from one IP address
    IpExceeded,
    /// RATE_002: Too many requests targeting one email address
    EmailExceeded,
}

impl RateLimitErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IpExceeded => "RATE_001",
            Self::EmailExceeded => "RATE_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        429
    }
}

/// Unified error type for the ticket relay.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Store error with code.
    #[error("[{code}] {message}")]
    Database {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Rate limit error with code.
    #[error("[{code}] {message}")]
    RateLimit {
        code: &'static str,
        message: String,
        http_status: u16,
        retry_after: Option<u64>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid ticket status: {0}")]
    InvalidStatus(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a store error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(
        code: RateLimitErrorCode,
        msg: impl Into<String>,
        retry_after: Option<u64>,
    ) -> Self {
        Self::RateLimit {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
            retry_after,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Database { http_status, .. } => *http_status,
            Self::RateLimit { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::InvalidStatus(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::Database { code, .. } => Some(code),
            Self::RateLimit { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
