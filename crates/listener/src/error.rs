//! Mapping of webhook outcomes onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline::WebhookError;
use serde::Serialize;

/// Error detail carried in every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Stable error code identifier.
    pub error_code: String,
    /// Human readable message.
    pub message: String,
}

/// Error response wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error detail.
    pub error: ErrorDetail,
}

/// A [`WebhookError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub WebhookError);

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn to_status_and_payload(&self) -> (StatusCode, ErrorResponse) {
        let (status, error_code) = match &self.0 {
            WebhookError::InputMissing { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            WebhookError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            WebhookError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            WebhookError::BackendFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };
        (
            status,
            ErrorResponse {
                error: ErrorDetail {
                    error_code: error_code.to_string(),
                    message: self.0.to_string(),
                },
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = self.to_status_and_payload();
        (status, axum::Json(payload)).into_response()
    }
}

/// Result type for webhook handlers.
pub type ApiResult<T> = Result<T, ApiError>;
