//! Upstream chat-completion adapter boundary.
//!
//! Once a key has been admitted, an adapter performs the actual upstream
//! call. The gateway core treats this boundary as opaque: any adapter-side
//! failure is reported as one of the structural kinds in [`AdapterError`]
//! and the raw underlying cause never leaks through. Adapters do not retry;
//! a failed upstream call is the caller's problem.

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::api::models::Message;
use crate::core::config::AppConfig;
use crate::core::error::AppError;

/// A lazy, finite, non-restartable sequence of response chunks.
pub type ChunkStream = BoxStream<'static, Result<String, AdapterError>>;

/// Structural error kinds at the adapter boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The provider refused or failed the request
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// The provider did not answer within the configured timeout
    #[error("Upstream request timed out")]
    Timeout,

    /// The provider's response could not be parsed
    #[error("Malformed upstream response: {0}")]
    Format(String),
}

impl From<AdapterError> for AppError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Upstream(msg) => AppError::Upstream(msg),
            AdapterError::Timeout => AppError::Timeout,
            AdapterError::Format(msg) => AppError::Format(msg),
        }
    }
}

/// Performs the upstream call for an admitted (model, key) pair.
pub trait ChatAdapter: Send + Sync {
    /// Complete a chat request and return the full response content.
    fn complete<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [Message],
        tools: Option<&'a [Value]>,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<String, AdapterError>>;

    /// Complete a chat request as a stream of content chunks.
    fn stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [Message],
        tools: Option<&'a [Value]>,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<ChunkStream, AdapterError>>;
}

struct Route {
    url: String,
    upstream_model: String,
}

/// Generic adapter for OpenAI-compatible chat-completion APIs.
///
/// One instance serves every configured model; the per-model base URL and
/// upstream model name come from configuration. No per-vendor payload
/// translation happens here.
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
    routes: HashMap<String, Route>,
}

impl OpenAiCompatAdapter {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let routes = config
            .models
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    Route {
                        url: format!("{}/chat/completions", m.api_base.trim_end_matches('/')),
                        upstream_model: m.upstream_model.clone(),
                    },
                )
            })
            .collect();

        Ok(Self { client, routes })
    }

    fn route(&self, model: &str) -> Result<&Route, AdapterError> {
        self.routes
            .get(model)
            .ok_or_else(|| AdapterError::Upstream(format!("No upstream route for model {}", model)))
    }

    fn payload(
        route: &Route,
        messages: &[Message],
        tools: Option<&[Value]>,
        stream: bool,
    ) -> Value {
        let mut payload = json!({
            "model": route.upstream_model,
            "messages": messages,
            "stream": stream,
        });
        if let Some(tools) = tools {
            payload["tools"] = Value::Array(tools.to_vec());
            payload["tool_choice"] = Value::String("auto".to_string());
        }
        payload
    }

    async fn send(
        &self,
        route: &Route,
        payload: &Value,
        api_key: &str,
    ) -> Result<reqwest::Response, AdapterError> {
        let response = self
            .client
            .post(&route.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Upstream(format!(
                "Provider returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

impl ChatAdapter for OpenAiCompatAdapter {
    fn complete<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [Message],
        tools: Option<&'a [Value]>,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<String, AdapterError>> {
        Box::pin(async move {
            let route = self.route(model)?;
            let payload = Self::payload(route, messages, tools, false);
            let response = self.send(route, &payload, api_key).await?;

            let body: Value = response
                .json()
                .await
                .map_err(|_| AdapterError::Format("Response body is not valid JSON".to_string()))?;

            body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    AdapterError::Format(
                        "Response is missing choices[0].message.content".to_string(),
                    )
                })
        })
    }

    fn stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [Message],
        tools: Option<&'a [Value]>,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<ChunkStream, AdapterError>> {
        Box::pin(async move {
            let route = self.route(model)?;
            let payload = Self::payload(route, messages, tools, true);
            let response = self.send(route, &payload, api_key).await?;

            let mut byte_stream = response.bytes_stream();
            let stream = async_stream::try_stream! {
                let mut buffer = String::new();
                while let Some(chunk) = byte_stream.next().await {
                    let bytes = chunk.map_err(classify_transport_error)?;
                    buffer.push_str(&String::from_utf8_lossy(&bytes));

                    // Drain complete SSE lines; a partial line stays buffered
                    // until the next chunk arrives.
                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        let line = line.trim_end();
                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let data = data.trim();
                        if data == "[DONE]" {
                            return;
                        }
                        if data.is_empty() {
                            continue;
                        }

                        let value: Value = serde_json::from_str(data).map_err(|_| {
                            AdapterError::Format("Invalid SSE chunk payload".to_string())
                        })?;
                        if let Some(delta) = value["choices"][0]["delta"]["content"].as_str() {
                            if !delta.is_empty() {
                                yield delta.to_string();
                            }
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as ChunkStream)
        })
    }
}

/// Map a transport failure to a structural kind without leaking the raw
/// cause (URLs and credentials may appear in reqwest error messages).
fn classify_transport_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else if err.is_decode() || err.is_body() {
        AdapterError::Format("Failed to read response body".to_string())
    } else {
        AdapterError::Upstream("Failed to reach provider".to_string())
    }
}
