//! Error types and handling for the LLM gateway.
//!
//! This module provides a unified error type [`AppError`] that wraps various error sources
//! and implements proper HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
///
/// All errors in the application should be converted to this type for consistent handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (file not found, parse errors, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// No model/key combination could admit the request.
    ///
    /// Surfaced to the caller as a retriable, rate-limit-style condition.
    #[error("Capacity exhausted: no model or key can admit the request")]
    CapacityExhausted,

    /// The selector's internal admission retry budget was exhausted under
    /// extreme contention. Callers treat this identically to
    /// [`AppError::CapacityExhausted`].
    #[error("Admission retry budget exhausted under contention")]
    AdmissionRaceExceeded,

    /// Caller passed an unregistered model name to an introspection query
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Caller passed an unregistered API key to an introspection query
    #[error("API key not found for model {model}")]
    KeyNotFound { model: String },

    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream provider returned an error
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream request timed out
    #[error("Gateway timeout")]
    Timeout,

    /// Upstream response could not be parsed
    #[error("Malformed upstream response: {0}")]
    Format(String),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::CapacityExhausted | AppError::AdmissionRaceExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "All models and keys are at capacity, retry later".to_string(),
            ),
            AppError::ModelNotFound(ref name) => {
                (StatusCode::NOT_FOUND, format!("Model {} not found", name))
            }
            AppError::KeyNotFound { ref model } => (
                StatusCode::NOT_FOUND,
                format!("API key not found for model {}", model),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Gateway timeout".to_string()),
            AppError::Format(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
