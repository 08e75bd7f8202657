//! HTTP error mapping.
//!
//! Nothing below the HTTP surface throws through to the top: handlers map
//! validation problems to 400, missing resources to 404, and everything
//! else to 500, always with an `{"error": …}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A handler error carrying its status code.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl From<llagent_runtime::RuntimeError> for AppError {
    fn from(err: llagent_runtime::RuntimeError) -> Self {
        match err {
            llagent_runtime::RuntimeError::SessionNotFound(_) => {
                Self::not_found("Session not found")
            }
            other => Self::internal(other.to_string()),
        }
    }
}
