//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationError;
use settlement::SettlementError;
use storage::StorageError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Service-layer error.
    Service(SettlementError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: SettlementError) -> (StatusCode, serde_json::Value) {
    match &err {
        SettlementError::Validation(ValidationError { field, message }) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "errors": { (*field): *message } }),
        ),
        SettlementError::EmptyCart
        | SettlementError::InsufficientFunds
        | SettlementError::ProductUnavailable
        | SettlementError::InvalidState { .. }
        | SettlementError::Status(_)
        | SettlementError::NonPositiveDeposit
        | SettlementError::UnrecognizedCallback { .. }
        | SettlementError::CallbackMismatch => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": err.to_string() }),
        ),
        SettlementError::Ownership(_) => (
            StatusCode::FORBIDDEN,
            serde_json::json!({ "error": err.to_string() }),
        ),
        // Paying someone else's order is the one authorization failure
        // surfaced as 405, matching the public API contract.
        SettlementError::Forbidden => (
            StatusCode::METHOD_NOT_ALLOWED,
            serde_json::json!({ "error": err.to_string() }),
        ),
        SettlementError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": err.to_string() }),
        ),
        SettlementError::Gateway(_) => {
            tracing::error!(error = %err, "payment gateway failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": err.to_string() }),
            )
        }
        SettlementError::Storage(storage_err) => storage_error_to_response(storage_err, &err),
    }
}

fn storage_error_to_response(
    err: &StorageError,
    outer: &SettlementError,
) -> (StatusCode, serde_json::Value) {
    match err {
        StorageError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": outer.to_string() }),
        ),
        StorageError::CardLimitExceeded { .. } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": outer.to_string() }),
        ),
        _ => {
            tracing::error!(error = %outer, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": outer.to_string() }),
            )
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Service(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Service(SettlementError::Storage(err))
    }
}
