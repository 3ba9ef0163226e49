//! API layer for the LLM gateway.
//!
//! This module contains all HTTP handlers, request/response models,
//! and streaming support for the API endpoints.

pub mod handlers;
pub mod models;
pub mod streaming;

// Re-export commonly used types
pub use handlers::{app_router, AppState};
pub use models::{ChatRequest, ChatResponse, HealthResponse, Message, SystemLoadResponse};
pub use streaming::sse_response;
