//! Response envelope shared by every endpoint.
//!
//! Successful calls return `{"ok": true, "data": ...}`; failures return
//! `{"ok": false, "error": {"code": ..., "message": ...}}` with a matching status code.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Error payload of a failed call.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
}

/// Envelope wrapping every API answer.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub ok: bool,
    /// Payload of a successful call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Payload of a failed call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps a successful result.
    pub const fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// Wraps an error.
    #[must_use]
    pub fn failure(err: &Error) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ApiError {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}

/// Maps an error to the HTTP status returned for it.
#[must_use]
pub const fn status_code(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        Error::NotAuthorized { .. } => StatusCode::FORBIDDEN,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::SchedulerAlreadyRunning { .. } => StatusCode::CONFLICT,
        Error::Config { .. }
        | Error::Database(_)
        | Error::Serialization(_)
        | Error::Io(_)
        | Error::EnvVar(_)
        | Error::AutoCloseFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ApiResponse::failure(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_code(&Error::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&Error::Unauthorized { user_id: 1 }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_code(&Error::NotAuthorized {
                user_id: 1,
                role: "learner".to_string()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_code(&Error::not_found("assignment", 1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&Error::SchedulerAlreadyRunning {
                scheduler_name: "s".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&Error::AutoCloseFailed {
                scheduler_name: "s".to_string(),
                message: "boom".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::failure(&Error::not_found("assignment", 9)))
            .unwrap_or_default();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "assignment '9' not found");
        assert!(body.get("data").is_none());
    }
}
