//! Logging utilities with model context support.
//!
//! This module provides context-aware logging that can include model names
//! and request IDs in HTTP request logs without threading them through every
//! function call.

tokio::task_local! {
    /// Task-local storage for the current model name.
    pub static MODEL_CONTEXT: String;
}

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current model name from context, if set.
///
/// Returns an empty string if no model context is set.
pub fn get_model_context() -> String {
    MODEL_CONTEXT
        .try_with(|ctx| ctx.clone())
        .unwrap_or_default()
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Return a loggable prefix of a credential string.
///
/// Credentials are never logged whole; at most the first 8 characters.
pub fn key_prefix(key: &str) -> &str {
    &key[..key.len().min(8)]
}
