//! OpenAI-compatible adapter behavior against a mocked provider.

mod common;

use assert_matches::assert_matches;
use common::{app_config, concurrency_model, user_message};
use futures::StreamExt;
use llm_gateway_rust::services::{AdapterError, ChatAdapter, OpenAiCompatAdapter};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter_for(server: &MockServer) -> OpenAiCompatAdapter {
    let mut model = concurrency_model("m", &[("sk-test", 1.0)], 10, 1.0);
    model.api_base = server.uri();
    model.upstream_model = "glm-4-flash".to_string();
    OpenAiCompatAdapter::from_config(&app_config(vec![model])).unwrap()
}

#[tokio::test]
async fn complete_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "glm-4-flash",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello there"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let result = adapter
        .complete("m", &user_message("hi"), None, "sk-test")
        .await
        .unwrap();
    assert_eq!(result, "hello there");
}

#[tokio::test]
async fn complete_forwards_tools_with_auto_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tool_choice": "auto",
            "tools": [{"type": "function"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let tools = vec![json!({"type": "function"})];
    let result = adapter
        .complete("m", &user_message("hi"), Some(&tools), "sk-test")
        .await
        .unwrap();
    assert_eq!(result, "ok");
}

#[tokio::test]
async fn provider_error_status_maps_to_upstream_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal provider detail"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let err = adapter
        .complete("m", &user_message("hi"), None, "sk-test")
        .await
        .unwrap_err();

    match err {
        AdapterError::Upstream(msg) => {
            assert!(msg.contains("500"));
            // Raw provider body must not leak through the boundary
            assert!(!msg.contains("internal provider detail"));
        }
        other => panic!("expected Upstream, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_content_maps_to_format_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let err = adapter
        .complete("m", &user_message("hi"), None, "sk-test")
        .await
        .unwrap_err();
    assert_matches!(err, AdapterError::Format(_));
}

#[tokio::test]
async fn stream_yields_delta_chunks_until_done() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n\n",
        "data: [DONE]\n\n",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let stream = adapter
        .stream("m", &user_message("hi"), None, "sk-test")
        .await
        .unwrap();

    let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
    assert_eq!(chunks, vec!["Hello", " world"]);
}

#[tokio::test]
async fn stream_with_invalid_payload_surfaces_format_error() {
    let body = "data: {not json}\n\n";

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let mut stream = adapter
        .stream("m", &user_message("hi"), None, "sk-test")
        .await
        .unwrap();

    let first = stream.next().await.unwrap();
    assert_matches!(first, Err(AdapterError::Format(_)));
}

#[tokio::test]
async fn unknown_model_is_refused_without_network_call() {
    let server = MockServer::start().await;
    let adapter = adapter_for(&server);

    let err = adapter
        .complete("unknown", &user_message("hi"), None, "sk-test")
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Upstream(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
