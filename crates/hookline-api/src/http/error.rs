//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use hookline_types::error::{JobError, ToolError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Job registry errors.
    Job(JobError),
    /// Tool lookup or input errors.
    Tool(ToolError),
    /// Missing credentials.
    Unauthorized(String),
    /// Credentials present but wrong.
    Forbidden(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<JobError> for AppError {
    fn from(e: JobError) -> Self {
        AppError::Job(e)
    }
}

impl From<ToolError> for AppError {
    fn from(e: ToolError) -> Self {
        AppError::Tool(e)
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Job(JobError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Job(JobError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION")
            }
            AppError::Job(JobError::InvalidState { .. }) => (StatusCode::CONFLICT, "INVALID_STATE"),
            AppError::Tool(ToolError::UnknownTool(_)) => (StatusCode::NOT_FOUND, "UNKNOWN_TOOL"),
            AppError::Tool(ToolError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Tool(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TOOL_ERROR"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Job(e) => e.to_string(),
            AppError::Tool(e) => e.to_string(),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Validation(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        } else {
            tracing::debug!(code, %message, "request rejected");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
