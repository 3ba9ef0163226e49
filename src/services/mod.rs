//! Business logic services for the LLM gateway.
//!
//! This module contains the admission and selection engine (strategies,
//! registry, selector, reporter) and the upstream adapter boundary.

pub mod adapter;
pub mod gateway;
pub mod registry;
pub mod reporter;
pub mod selector;
pub mod strategy;

// Re-export commonly used types
pub use adapter::{AdapterError, ChatAdapter, ChunkStream, OpenAiCompatAdapter};
pub use gateway::{AdmittedStream, LlmGateway};
pub use registry::{Model, ModelRegistry};
pub use reporter::CapacityReporter;
pub use selector::{Admission, Selector};
pub use strategy::{
    CapacitySnapshot, CapacityStrategy, CapacityType, ConcurrencyStrategy, KeyEntry, QpsStrategy,
};
