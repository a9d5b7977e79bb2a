//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{ErrorKind, TransferError};

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Ledger errors (4xx, or 5xx for storage failures)
    #[error(transparent)]
    Ledger(#[from] TransferError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ledger(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, error_code, details) = match &self {
            AppError::InvalidRequest(msg) => {
                (self.to_string(), "invalid_request", Some(msg.clone()))
            }

            // Domain errors carry their own message; storage causes stay in the logs
            AppError::Ledger(ledger_err) => match ledger_err.kind() {
                ErrorKind::Database => {
                    tracing::error!("Database error: {:?}", ledger_err);
                    (
                        "Error occurred when trying to work with database".to_string(),
                        ErrorKind::Database.as_str(),
                        None,
                    )
                }
                kind => (ledger_err.to_string(), kind.as_str(), None),
            },
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
