//! LLM Gateway - a weighted multi-provider proxy for chat-completion APIs
//!
//! This library aggregates multiple chat-completion providers behind one
//! endpoint and spreads traffic across provider models and per-model API
//! keys according to configured weights and capacity limits:
//!
//! - **Capacity strategies**: per-key concurrency bounds or rolling QPS
//!   windows, with race-free admission accounting
//! - **Two-stage weighted selection**: a weighted draw over models with
//!   remaining capacity, then a weighted draw over that model's keys
//! - **Scoped admission**: every admitted request releases its slot exactly
//!   once, including when a streaming client disconnects early
//! - **Capacity introspection**: system/model/key load snapshots and a
//!   system load percentage
//! - **Metrics & logging**: Prometheus metrics and structured tracing
//!
//! # Architecture
//!
//! The codebase is organized into three main layers:
//!
//! - [`core`]: Core functionality (config, errors, logging, metrics)
//! - [`api`]: HTTP handlers and request/response models
//! - [`services`]: Business logic (strategies, registry, selector, reporter,
//!   adapter, gateway)
//!
//! # Configuration
//!
//! Configuration is loaded from a YAML file (`CONFIG_PATH`, default
//! `config.yaml`) with `${VAR}` environment expansion. Optional environment
//! variables:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 9000)
//! - `REQUEST_TIMEOUT_SECS`: Upstream request timeout (default: 300)

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{app_router, AppState, ChatRequest, ChatResponse, Message};
pub use core::{AppConfig, AppError, Result};
pub use services::{CapacityReporter, LlmGateway, ModelRegistry, Selector};
