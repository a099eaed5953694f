//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto the uniform JSON error body every handler returns.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::config::ConfigError;
use site_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The client sent a payload that is missing required input or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials/token.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed: insufficient permission or a foreign resource.
    #[error("{0}")]
    Forbidden(String),

    /// The requested document does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A create collided with an existing key.
    #[error("{0}")]
    Conflict(String),

    /// An upstream collaborator (blob store, LLM, proxied origin) failed mid-request.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Config(_)
            | ApiError::Port(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to clients. Internal failures are collapsed to a
    /// generic message; the detail stays in the server log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Config(_)
            | ApiError::Io(_)
            | ApiError::Internal(_)
            | ApiError::Port(PortError::Unexpected(_)) => "Internal server error".to_string(),
            ApiError::Port(PortError::NotFound(_)) => "not found".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_not_found_maps_to_plain_404_message() {
        let err = ApiError::Port(PortError::NotFound("chat-log:abc".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "not found");
    }

    #[test]
    fn internal_detail_is_hidden_from_clients() {
        let err = ApiError::Port(PortError::Unexpected("kv store: io timeout".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
