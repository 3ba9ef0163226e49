//! Shared fixtures for integration tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use llm_gateway_rust::api::models::Message;
use llm_gateway_rust::core::config::{
    ApiKeyConfig, AppConfig, ModelConfig, ServerConfig, StrategyConfig,
};
use llm_gateway_rust::services::{AdapterError, ChatAdapter, ChunkStream};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn concurrency_model(
    name: &str,
    keys: &[(&str, f64)],
    max_concurrency: u32,
    model_weight: f64,
) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        api_base: "http://localhost:8000/v1".to_string(),
        upstream_model: "test-model".to_string(),
        api_keys: keys
            .iter()
            .map(|(k, w)| ApiKeyConfig {
                key: k.to_string(),
                weight: *w,
            })
            .collect(),
        model_weight,
        strategy: StrategyConfig::Concurrency { max_concurrency },
    }
}

pub fn qps_model(
    name: &str,
    keys: &[(&str, f64)],
    max_qps: u32,
    model_weight: f64,
) -> ModelConfig {
    let mut model = concurrency_model(name, keys, 1, model_weight);
    model.strategy = StrategyConfig::Qps { max_qps };
    model
}

pub fn app_config(models: Vec<ModelConfig>) -> AppConfig {
    AppConfig {
        models,
        server: ServerConfig::default(),
        request_timeout_secs: 300,
    }
}

/// Adapter double that counts calls and replays canned chunks.
pub struct MockAdapter {
    calls: AtomicUsize,
    chunks: Vec<String>,
    fail: bool,
}

impl MockAdapter {
    pub fn new(chunks: Vec<&str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            chunks: chunks.into_iter().map(str::to_string).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            chunks: vec![],
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatAdapter for MockAdapter {
    fn complete<'a>(
        &'a self,
        _model: &'a str,
        _messages: &'a [Message],
        _tools: Option<&'a [Value]>,
        _api_key: &'a str,
    ) -> BoxFuture<'a, Result<String, AdapterError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if self.fail {
                Err(AdapterError::Upstream("mock failure".to_string()))
            } else {
                Ok(self.chunks.concat())
            }
        })
    }

    fn stream<'a>(
        &'a self,
        _model: &'a str,
        _messages: &'a [Message],
        _tools: Option<&'a [Value]>,
        _api_key: &'a str,
    ) -> BoxFuture<'a, Result<ChunkStream, AdapterError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if self.fail {
                return Err(AdapterError::Upstream("mock failure".to_string()));
            }
            let chunks: Vec<Result<String, AdapterError>> =
                self.chunks.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(chunks)) as ChunkStream)
        })
    }
}

pub fn user_message(content: &str) -> Vec<Message> {
    vec![Message {
        role: "user".to_string(),
        content: content.to_string(),
    }]
}
