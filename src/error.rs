//! Error handling module
//!
//! HTTP-facing error type and response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
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
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }

            // Ledger errors - map to appropriate HTTP status
            AppError::Ledger(ledger_err) => match ledger_err {
                LedgerError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
                }
                LedgerError::InsufficientFunds { account_id, .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds", Some(account_id.clone()))
                }
                LedgerError::AccountNotFound(id) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
                }
                LedgerError::AccountAlreadyExists(id) => {
                    (StatusCode::CONFLICT, "account_exists", Some(id.clone()))
                }
                LedgerError::ConcurrencyConflict { aggregate_id, version } => (
                    StatusCode::CONFLICT,
                    "concurrency_conflict",
                    Some(format!("{aggregate_id} at version {version}")),
                ),
                LedgerError::RetriesExhausted { transaction_id, .. } => {
                    (StatusCode::CONFLICT, "retries_exhausted", Some(transaction_id.clone()))
                }
                LedgerError::Deserialization(e) => {
                    tracing::error!("Event deserialization error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "deserialization_error", None)
                }
                LedgerError::Store(e) => {
                    tracing::error!("Event store error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
                LedgerError::Snapshot(e) => {
                    tracing::error!("Snapshot store error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
                LedgerError::Replay(e) => {
                    tracing::error!("Event stream integrity error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
            },

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
