//! API error responses with error codes
//!
//! Every failure is returned as `{"error": message}` with the matching HTTP
//! status. The machine-readable code travels in the `x-error-code` header.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::infra::RaffleError;

const ERROR_CODE_HEADER: HeaderName = HeaderName::from_static("x-error-code");

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    /// Request body or path is malformed
    InvalidRequestBody,
    /// Field value is invalid
    InvalidFieldValue,
    /// Ticket count outside the accepted range
    InvalidCount,

    // Resource errors
    RaffleNotFound,
    TicketNotFound,

    // Conflict errors
    /// Ticket was redeemed before
    TicketAlreadyUsed,
    /// Resource already exists
    AlreadyExists,

    // Reconciliation errors
    /// Expected event missing from a confirmed receipt
    EventNotFound,
    /// Ledger call failed
    LedgerError,

    // Infrastructure errors
    DatabaseError,
    UploadFailed,
    /// Optional collaborator not configured
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidCount => StatusCode::BAD_REQUEST,

            ErrorCode::RaffleNotFound | ErrorCode::TicketNotFound => StatusCode::NOT_FOUND,

            // Conflicts are reported as 400 to match existing clients.
            ErrorCode::TicketAlreadyUsed | ErrorCode::AlreadyExists => StatusCode::BAD_REQUEST,

            ErrorCode::EventNotFound
            | ErrorCode::LedgerError
            | ErrorCode::DatabaseError
            | ErrorCode::UploadFailed
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::InvalidCount => "INVALID_COUNT",
            ErrorCode::RaffleNotFound => "RAFFLE_NOT_FOUND",
            ErrorCode::TicketNotFound => "TICKET_NOT_FOUND",
            ErrorCode::TicketAlreadyUsed => "TICKET_ALREADY_USED",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::EventNotFound => "EVENT_NOT_FOUND",
            ErrorCode::LedgerError => "LEDGER_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

/// Error body sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API error carrying a code and a human-readable message
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequestBody, message)
    }

    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.code.to_string();
        let mut response = (
            status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response();

        if let Ok(code_value) = HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(ERROR_CODE_HEADER, code_value);
        }

        response
    }
}

impl From<RaffleError> for ApiError {
    fn from(err: RaffleError) -> Self {
        let code = match &err {
            RaffleError::Validation(_) => ErrorCode::InvalidFieldValue,
            RaffleError::InvalidCount => ErrorCode::InvalidCount,
            RaffleError::RaffleNotFound(_) => ErrorCode::RaffleNotFound,
            RaffleError::TicketNotFound => ErrorCode::TicketNotFound,
            RaffleError::TicketAlreadyUsed => ErrorCode::TicketAlreadyUsed,
            RaffleError::DuplicateRaffle(_) | RaffleError::DuplicateUser(_) => {
                ErrorCode::AlreadyExists
            }
            RaffleError::EventNotFound(_) => ErrorCode::EventNotFound,
            RaffleError::Ledger(_) | RaffleError::Unconfirmed { .. } => ErrorCode::LedgerError,
            RaffleError::Database(_) => ErrorCode::DatabaseError,
            RaffleError::Upload(_) => ErrorCode::UploadFailed,
            RaffleError::NotConfigured(_) => ErrorCode::ServiceUnavailable,
            RaffleError::Internal(_) => ErrorCode::InternalError,
        };
        if code.http_status().is_server_error() {
            error!(code = %code, error = %err, "Request failed");
        }
        ApiError::new(code, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(err.body_text())
    }
}
