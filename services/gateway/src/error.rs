//! services/gateway/src/error.rs
//!
//! Defines the primary error type for the gateway service and the JSON error
//! body every failed request returns.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use conceptify_core::ports::PortError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `gateway` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//=========================================================================================
// HTTP Error Responses
//=========================================================================================

/// The JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A status code plus `ErrorBody`, built from a `PortError`.
#[derive(Debug)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, None)
    }
}

impl From<PortError> for ErrorResponse {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg, None),
            PortError::NotFound(what) => Self::new(
                StatusCode::NOT_FOUND,
                "OCR result file not found",
                Some(what),
            ),
            PortError::Extraction { message, details } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, Some(details))
            }
            PortError::MalformedOutput(details) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to parse OCR results",
                Some(details),
            ),
            PortError::Conflict(details) => Self::new(
                StatusCode::CONFLICT,
                "OCR result was modified by another client",
                Some(details),
            ),
            PortError::Busy => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many uploads are being processed, try again shortly",
                None,
            ),
            PortError::Timeout(secs) => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                "OCR processing timed out",
                Some(format!("Extraction did not finish within {} seconds", secs)),
            ),
            PortError::Unauthorized => Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", None),
            PortError::Network(details) => Self::new(
                StatusCode::BAD_GATEWAY,
                "Upstream unreachable",
                Some(details),
            ),
            PortError::Unexpected(details) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected internal error occurred",
                Some(details),
            ),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
