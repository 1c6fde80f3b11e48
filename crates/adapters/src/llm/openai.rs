//! OpenAI Responses API chat adapter

use async_trait::async_trait;
use newsflow_domain::{AiError, ChatModel, ChatRequest};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LlmConfig;

/// Chat model backed by the OpenAI Responses API
pub struct OpenAiChatModel {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiChatModel {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Result<Self, AiError> {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            config,
        })
    }

    async fn call_api(&self, request: &ChatRequest) -> Result<String, AiError> {
        let body = ResponsesRequest {
            model: self.config.model.clone(),
            input: request.user.clone(),
            instructions: Some(request.system.clone()),
            temperature: Some(request.temperature),
            max_output_tokens: Some(request.max_tokens),
        };

        let url = format!("{}/responses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::Api(e.to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(AiError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("API returned {}: {}", status, body)));
        }

        let api_response: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidFormat(e.to_string()))?;

        let text = extract_output_text(api_response);
        if text.is_empty() {
            return Err(AiError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct ResponsesRequest {
    model: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct ResponsesResponse {
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    r#type: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    r#type: String,
    #[serde(default)]
    text: String,
}

pub(super) fn extract_output_text(response: ResponsesResponse) -> String {
    response
        .output
        .into_iter()
        .filter_map(|item| {
            if item.r#type == "message" {
                item.content.into_iter().find_map(|c| {
                    if c.r#type == "output_text" {
                        Some(c.text)
                    } else {
                        None
                    }
                })
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, AiError> {
        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                tracing::warn!(attempt = attempt, "Retrying chat completion");
                tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt))).await;
            }

            match self.call_api(&request).await {
                Ok(text) => return Ok(text),
                Err(AiError::RateLimited) => return Err(AiError::RateLimited),
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::Api("Unknown error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_success_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "output": [
                {
                    "type": "message",
                    "content": [
                        {"type": "output_text", "text": text}
                    ]
                }
            ]
        })
    }

    fn model(server: &MockServer, retries: u32) -> OpenAiChatModel {
        OpenAiChatModel::with_base_url(
            SecretString::new("test-key".into()),
            server.uri(),
            LlmConfig {
                retries,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mock_success_response(r#"{"approved": true}"#)),
            )
            .mount(&mock_server)
            .await;

        let text = model(&mock_server, 0)
            .complete(ChatRequest::new("system", "user"))
            .await
            .unwrap();

        assert_eq!(text, r#"{"approved": true}"#);
    }

    #[tokio::test]
    async fn test_complete_rate_limited_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = model(&mock_server, 2)
            .complete(ChatRequest::new("system", "user"))
            .await;

        assert!(matches!(result, Err(AiError::RateLimited)));
    }

    #[tokio::test]
    async fn test_complete_retries_server_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let result = model(&mock_server, 1)
            .complete(ChatRequest::new("system", "user"))
            .await;

        assert!(matches!(result, Err(AiError::Api(_))));
    }

    #[tokio::test]
    async fn test_empty_output_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": []
            })))
            .mount(&mock_server)
            .await;

        let result = model(&mock_server, 0)
            .complete(ChatRequest::new("system", "user"))
            .await;

        assert!(matches!(result, Err(AiError::InvalidFormat(_))));
    }
}
