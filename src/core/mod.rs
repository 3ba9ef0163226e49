//! Core functionality for the LLM gateway.
//!
//! This module contains fundamental components used throughout the application:
//! - Configuration management
//! - Error handling
//! - Logging context
//! - Metrics collection

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use config::{ApiKeyConfig, AppConfig, ModelConfig, ServerConfig, StrategyConfig};
pub use error::{AppError, Result};
pub use logging::{generate_request_id, get_model_context, get_request_id, MODEL_CONTEXT};
pub use metrics::{get_metrics, init_metrics, Metrics};
