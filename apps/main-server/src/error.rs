//! Server error types.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use task_store::{ErrorKind, TaskStoreError};

/// Machine-readable error codes returned in error bodies.
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const AUTHENTICATION_REQUIRED: &str = "authentication_required";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Task store error.
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST, msg.clone())
            }
            ServerError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTHENTICATION_REQUIRED,
                "Authentication required".to_string(),
            ),
            ServerError::Store(e) => match e.kind() {
                ErrorKind::Validation => {
                    (StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST, e.to_string())
                }
                ErrorKind::NotFound => {
                    (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, "Task not found".to_string())
                }
                ErrorKind::Unavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    error_codes::UNAVAILABLE,
                    "Storage unavailable".to_string(),
                ),
            },
            ServerError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, msg.clone())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ServerError {
    fn from(_: PathRejection) -> Self {
        ServerError::InvalidRequest("Invalid task ID".to_string())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let cases = [
            (TaskStoreError::validation("invalid limit"), StatusCode::BAD_REQUEST),
            (TaskStoreError::not_found("Task", 1), StatusCode::NOT_FOUND),
            (
                TaskStoreError::Unavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            let response = ServerError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let error = ServerError::from(TaskStoreError::Unavailable(
            "connection refused by 10.0.0.5:5432".to_string(),
        ));
        let (_, code, message) = error.parts();
        assert_eq!(code, error_codes::UNAVAILABLE);
        assert_eq!(message, "Storage unavailable");
    }
}
