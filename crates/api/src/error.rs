//! API error responses.
//!
//! Every failure is rendered as `{ "error": <code>, "message": <text> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use treasury_core::TreasuryError;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the HTTP layer.
#[derive(Debug)]
pub enum ApiError {
    /// An engine operation failed.
    Treasury(TreasuryError),
    /// A required context header is absent.
    MissingHeader(&'static str),
    /// A context header is not a valid id.
    InvalidHeader(&'static str),
}

impl From<TreasuryError> for ApiError {
    fn from(err: TreasuryError) -> Self {
        Self::Treasury(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Treasury(err) => {
                let status = StatusCode::from_u16(err.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let message = if status.is_server_error() {
                    "An internal error occurred".to_string()
                } else {
                    err.to_string()
                };
                (status, err.error_code(), message)
            }
            Self::MissingHeader(name) => (
                StatusCode::BAD_REQUEST,
                "MISSING_CONTEXT",
                format!("Header {name} is required"),
            ),
            Self::InvalidHeader(name) => (
                StatusCode::BAD_REQUEST,
                "INVALID_CONTEXT",
                format!("Header {name} must be a UUID"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if let Self::Treasury(err) = &self {
            if status.is_server_error() {
                tracing::error!(error = %err, "Request failed");
            } else {
                tracing::debug!(error = %err, code, "Request rejected");
            }
        }
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
