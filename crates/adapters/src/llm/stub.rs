//! Stub models returning fixed responses, selected by the "stub" provider
//! for offline runs

use async_trait::async_trait;
use newsflow_domain::{AiError, ChatModel, ChatRequest, VisionModel};

/// Chat model returning a fixed response, or an error
pub struct StubChatModel {
    response: Result<String, AiError>,
}

impl StubChatModel {
    /// A stub whose fixed response is a superset satisfying every pipeline
    /// prompt: moderation verdict, per-language rewrite, article profile,
    /// and image pre-analysis
    pub fn approving() -> Self {
        Self {
            response: Ok(r#"{
                "approved": true,
                "title": "Stub title",
                "body": "Stub body.",
                "short_description": "Stub summary.",
                "approach": "creative",
                "company_name": "Stub Co",
                "category": "general",
                "visual_concept": "abstract newsprint collage"
            }"#
            .to_string()),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
        }
    }

    pub fn with_error(error: AiError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[async_trait]
impl ChatModel for StubChatModel {
    async fn complete(&self, _request: ChatRequest) -> Result<String, AiError> {
        clone_result(&self.response)
    }
}

/// Vision model returning a fixed critique
pub struct StubVisionModel {
    response: Result<String, AiError>,
}

impl StubVisionModel {
    pub fn passing() -> Self {
        Self {
            response: Ok(r#"{"overall_score": 8.0}"#.to_string()),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
        }
    }
}

#[async_trait]
impl VisionModel for StubVisionModel {
    async fn critique(&self, _prompt: &str, _image_url: &str) -> Result<String, AiError> {
        clone_result(&self.response)
    }
}

fn clone_result(result: &Result<String, AiError>) -> Result<String, AiError> {
    match result {
        Ok(text) => Ok(text.clone()),
        Err(AiError::Api(msg)) => Err(AiError::Api(msg.clone())),
        Err(AiError::InvalidFormat(msg)) => Err(AiError::InvalidFormat(msg.clone())),
        Err(AiError::RateLimited) => Err(AiError::RateLimited),
        Err(AiError::Timeout) => Err(AiError::Timeout),
        Err(AiError::Config(msg)) => Err(AiError::Config(msg.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_chat_returns_configured_response() {
        let stub = StubChatModel::with_response("hello");
        let text = stub.complete(ChatRequest::new("s", "u")).await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_stub_chat_returns_configured_error() {
        let stub = StubChatModel::with_error(AiError::Timeout);
        let result = stub.complete(ChatRequest::new("s", "u")).await;
        assert!(matches!(result, Err(AiError::Timeout)));
    }

    #[tokio::test]
    async fn test_approving_stub_is_valid_json() {
        let stub = StubChatModel::approving();
        let text = stub.complete(ChatRequest::new("s", "u")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["approved"], true);
        assert!(value["title"].is_string());
        assert!(value["visual_concept"].is_string());
    }

    #[tokio::test]
    async fn test_stub_vision_passes() {
        let stub = StubVisionModel::passing();
        let text = stub.critique("p", "url").await.unwrap();
        assert!(text.contains("overall_score"));
    }
}
