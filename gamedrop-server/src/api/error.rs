//! Error responses
//!
//! Every failure leaves the server as `{success: false, message}` with the
//! status derived from the core error variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use gamedrop_core::Error;

pub const LOGIN_REQUIRED: &str = "Login required";
pub const MISSING_JSON: &str = "Missing JSON data";
const INTERNAL: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, LOGIN_REQUIRED)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
    }
}

/// HTTP status for a core error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Authentication(_) => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) | Error::ArtifactNotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::CatalogUnavailable(_)
        | Error::InvalidCatalogEntry(_)
        | Error::SegmentFetchFailed { .. }
        | Error::Storage(_)
        | Error::Config(_)
        | Error::Io(_)
        | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = status_for(&err);
        let message = match err {
            Error::Validation(m)
            | Error::Authentication(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::Conflict(m) => m,
            Error::ArtifactNotFound(_) => "Game ID not found".to_string(),
            upstream if upstream.is_upstream() => upstream.to_string(),
            // Local storage details stay in the server log
            other => {
                error!(error = %other, "request failed");
                INTERNAL.to_string()
            }
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(status = self.status.as_u16(), message = %self.message, "request rejected");
        (
            self.status,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}
