//! API error handling
//!
//! Escrow rejections map onto HTTP status codes; the body always carries the
//! stable error code and the human-readable message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use escrowbot_types::EscrowError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Escrow Errors
    // =========================================================================
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    // =========================================================================
    // Resource Errors
    // =========================================================================
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Get the stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Escrow(err) => err.error_code(),
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Escrow(err) => match err {
                EscrowError::NotFound { .. } => StatusCode::NOT_FOUND,
                EscrowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                EscrowError::InvalidState { .. }
                | EscrowError::AlreadyDisputed { .. }
                | EscrowError::SeatTaken { .. }
                | EscrowError::SameParticipant { .. }
                | EscrowError::ParticipantBusy { .. } => StatusCode::CONFLICT,
                EscrowError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EscrowError::QuoteUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::InvalidParameter(_) | Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Check if the caller may retry the same request
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Escrow(err) if err.is_retriable())
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub code: String,
    /// Human-readable error message
    pub msg: String,
    /// Whether re-sending the request may succeed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retriable: bool,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code().to_string(),
            msg: err.to_string(),
            retriable: err.is_retriable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.error_code(), error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrowbot_types::{CryptoSymbol, TicketStatus};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EscrowError::not_found("ABCD1234"), StatusCode::NOT_FOUND),
            (EscrowError::unauthorized("cancel", "participant"), StatusCode::FORBIDDEN),
            (
                EscrowError::InvalidState {
                    ticket_id: "ABCD1234".into(),
                    status: TicketStatus::Disputed,
                    action: "cancel",
                },
                StatusCode::CONFLICT,
            ),
            (EscrowError::invalid_input("amount", "empty"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                EscrowError::QuoteUnavailable {
                    symbol: CryptoSymbol::BTC,
                    reason: "timeout".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_error_body() {
        let err = ApiError::from(EscrowError::QuoteUnavailable {
            symbol: CryptoSymbol::ETH,
            reason: "timeout".into(),
        });
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "QUOTE_UNAVAILABLE");
        assert!(body.retriable);
        assert!(body.msg.contains("ETH"));

        let body = ErrorResponse::from(&ApiError::InvalidParameter("ticket_id".into()));
        assert_eq!(body.code, "INVALID_PARAMETER");
        assert!(!body.retriable);
    }
}
