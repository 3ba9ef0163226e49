//! HTTP handlers for the gateway's API endpoints.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::api::models::{
    parse_chat_request, ChatResponse, HealthResponse, SystemLoadResponse,
};
use crate::api::streaming::sse_response;
use crate::core::error::Result;
use crate::core::logging::{generate_request_id, REQUEST_ID};
use crate::core::metrics::get_metrics;
use crate::services::{CapacityReporter, LlmGateway};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<LlmGateway>,
    pub reporter: CapacityReporter,
}

/// Build the application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/llm/chat", post(chat))
        .route("/llm/chat/stream", post(chat_stream))
        .route("/llm/system-load", get(system_load))
        .route("/llm/system-capacity", get(system_capacity))
        .route("/llm/model-load/:model", get(model_load))
        .route("/llm/key-load/:model/:key", get(key_load))
        .route("/llm/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// Count the request against one endpoint label and convert to a response.
fn respond<T: IntoResponse>(endpoint: &str, result: Result<T>) -> Response {
    let response = match result {
        Ok(value) => value.into_response(),
        Err(e) => e.into_response(),
    };
    get_metrics()
        .request_count
        .with_label_values(&[endpoint, response.status().as_str()])
        .inc();
    response
}

/// `POST /llm/chat` — serve a sync chat completion.
pub async fn chat(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let request_id = generate_request_id();
    let result = REQUEST_ID
        .scope(request_id, async {
            let request = parse_chat_request(body)?;
            let result = state
                .gateway
                .process_request(&request.messages, request.tools.as_deref())
                .await?;
            Ok(Json(ChatResponse { result }))
        })
        .await;
    respond("/llm/chat", result)
}

/// `POST /llm/chat/stream` — serve a streaming chat completion.
pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let request_id = generate_request_id();
    let result = REQUEST_ID
        .scope(request_id, async {
            let request = parse_chat_request(body)?;
            let stream = state
                .gateway
                .process_stream_request(&request.messages, request.tools.as_deref())
                .await?;
            Ok(sse_response(stream))
        })
        .await;
    respond("/llm/chat/stream", result)
}

/// `GET /llm/system-load` — system-wide load percentage.
pub async fn system_load(State(state): State<AppState>) -> Json<SystemLoadResponse> {
    Json(SystemLoadResponse {
        load_percent: state.reporter.system_load_percent(),
    })
}

/// `GET /llm/system-capacity` — full capacity snapshot.
pub async fn system_capacity(State(state): State<AppState>) -> Response {
    Json(state.reporter.system_capacity()).into_response()
}

/// `GET /llm/model-load/{model}` — per-model capacity detail.
pub async fn model_load(State(state): State<AppState>, Path(model): Path<String>) -> Response {
    respond(
        "/llm/model-load",
        state.reporter.model_capacity(&model).map(Json),
    )
}

/// `GET /llm/key-load/{model}/{key}` — per-key capacity detail.
pub async fn key_load(
    State(state): State<AppState>,
    Path((model, key)): Path<(String, String)>,
) -> Response {
    respond(
        "/llm/key-load",
        state.reporter.key_capacity(&model, &key).map(Json),
    )
}

/// `GET /llm/health` — liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

/// `GET /metrics` — Prometheus metrics in text exposition format.
pub async fn metrics_handler() -> Response {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
