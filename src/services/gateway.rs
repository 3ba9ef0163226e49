//! Request orchestration: selection, admission, and adapter dispatch.
//!
//! The gateway ties the selector to the adapter. An admission is held as an
//! RAII guard for the duration of the adapter's work: for sync requests the
//! guard drops when the adapter resolves, for streams it moves into the
//! returned stream so that dropping the stream — normal exhaustion, error,
//! or the consumer disconnecting early — releases the slot exactly once.

use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::api::models::Message;
use crate::core::error::{AppError, Result};
use crate::core::logging::MODEL_CONTEXT;
use crate::services::adapter::{AdapterError, ChatAdapter, ChunkStream};
use crate::services::registry::ModelRegistry;
use crate::services::selector::{Admission, Selector};

/// A chunk stream that owns its admission slot.
///
/// The slot is released when the stream is dropped, whether or not it was
/// consumed to the end.
pub struct AdmittedStream {
    inner: ChunkStream,
    _admission: Admission,
}

impl Stream for AdmittedStream {
    type Item = std::result::Result<String, AdapterError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

/// Front door for chat traffic: picks a model and key, then invokes the
/// adapter with the admitted credential.
pub struct LlmGateway {
    selector: Selector,
    adapter: Arc<dyn ChatAdapter>,
}

impl LlmGateway {
    pub fn new(registry: Arc<ModelRegistry>, adapter: Arc<dyn ChatAdapter>) -> Self {
        Self {
            selector: Selector::new(registry),
            adapter,
        }
    }

    /// Serve a sync chat request and return the full response content.
    ///
    /// The gateway never retries the upstream call; an adapter failure
    /// propagates after the admission is released.
    pub async fn process_request(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<String> {
        let admission = self.selector.select_for_request()?;
        tracing::debug!(model = admission.model_name(), "dispatching chat request");

        let result = MODEL_CONTEXT
            .scope(admission.model_name().to_string(), async {
                self.adapter
                    .complete(admission.model_name(), messages, tools, admission.key())
                    .await
            })
            .await;

        result.map_err(AppError::from)
    }

    /// Serve a streaming chat request.
    ///
    /// The returned stream owns the admission; the caller must not clone or
    /// restart it.
    pub async fn process_stream_request(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<AdmittedStream> {
        let admission = self.selector.select_for_request()?;
        tracing::debug!(
            model = admission.model_name(),
            "dispatching streaming chat request"
        );

        let inner = self
            .adapter
            .stream(admission.model_name(), messages, tools, admission.key())
            .await?;

        Ok(AdmittedStream {
            inner,
            _admission: admission,
        })
    }
}
