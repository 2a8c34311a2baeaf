use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::error::Error;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Client-visible failures. Session failures of every kind collapse into
/// one `Unauthorized` so the response never says why a cookie was refused.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    OperationFailed(&'static str),
}

impl ApiError {
    /// Map a core error for `operation`, logging the detail the client
    /// does not get to see.
    pub fn from_core(err: Error, operation: &'static str) -> Self {
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            ref e if e.is_session_failure() => {
                tracing::debug!(error = %e, "Session cookie rejected");
                ApiError::Unauthorized
            }
            Error::Protocol(ref detail) => {
                tracing::error!(%detail, "Upstream contract violated (possible API drift)");
                ApiError::OperationFailed(operation)
            }
            e => {
                tracing::error!(error = %e, "{operation}");
                ApiError::OperationFailed(operation)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            ApiError::OperationFailed(operation) => {
                (StatusCode::INTERNAL_SERVER_ERROR, operation.to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
