//! Request and response models for the API endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::AppError;

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Body of `POST /llm/chat` and `POST /llm/chat/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    /// Tool definitions, passed through to the provider untouched
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
}

/// Response of `POST /llm/chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub result: String,
}

/// Response of `GET /llm/system-load`.
#[derive(Debug, Serialize)]
pub struct SystemLoadResponse {
    pub load_percent: f64,
}

/// Response of `GET /llm/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Parse a chat request body, reporting a missing `messages` field the way
/// clients expect (400, not a serde rejection).
pub fn parse_chat_request(body: Value) -> Result<ChatRequest, AppError> {
    if body.get("messages").is_none() {
        return Err(AppError::BadRequest(
            "Missing required field 'messages'".to_string(),
        ));
    }
    serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_request() {
        let body = json!({
            "messages": [{"role": "user", "content": "hello"}],
            "tools": [{"type": "function"}]
        });
        let request = parse_chat_request(body).unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.tools.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_chat_request_without_tools() {
        let body = json!({"messages": []});
        let request = parse_chat_request(body).unwrap();
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_parse_chat_request_missing_messages() {
        let err = parse_chat_request(json!({"tools": []})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("messages"));
    }

    #[test]
    fn test_parse_chat_request_malformed_messages() {
        let err = parse_chat_request(json!({"messages": "not-a-list"})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
