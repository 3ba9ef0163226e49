//! Server-Sent Events (SSE) response assembly for streaming chat requests.
//!
//! The admitted stream owns its capacity slot, so the response body must
//! keep the stream alive until the client disconnects or the stream ends;
//! either way the slot is released when the body is dropped.

use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use std::convert::Infallible;

use crate::services::gateway::AdmittedStream;

/// Wrap an admitted chunk stream into an SSE response.
///
/// Content chunks become `data:` frames carrying a JSON `delta`; an
/// adapter error becomes an `error` event; the stream is terminated by a
/// `data: [DONE]` frame.
pub fn sse_response(stream: AdmittedStream) -> Response {
    let framed = stream
        .map(|item| {
            let frame = match item {
                Ok(text) => format!("data: {}\n\n", json!({ "delta": text })),
                Err(e) => {
                    tracing::warn!(error = %e, "streaming request failed mid-stream");
                    format!("event: error\ndata: {}\n\n", json!({ "error": e.to_string() }))
                }
            };
            Ok::<Bytes, Infallible>(Bytes::from(frame))
        })
        .chain(futures::stream::once(async {
            Ok(Bytes::from("data: [DONE]\n\n"))
        }));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(framed))
        .expect("static SSE headers are always valid")
}
