//! OpenAI Responses API vision adapter

use async_trait::async_trait;
use newsflow_domain::{AiError, VisionModel};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use super::LlmConfig;
use super::openai::{ResponsesResponse, extract_output_text};

/// Vision critique model backed by the OpenAI Responses API. The image is
/// passed by URL; the platform fetches it server-side.
pub struct OpenAiVisionModel {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiVisionModel {
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
}

#[derive(Serialize)]
struct VisionRequest {
    model: String,
    input: Vec<VisionMessage>,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct VisionMessage {
    role: &'static str,
    content: Vec<VisionContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum VisionContent {
    #[serde(rename = "input_text")]
    Text { text: String },
    #[serde(rename = "input_image")]
    Image { image_url: String },
}

#[async_trait]
impl VisionModel for OpenAiVisionModel {
    async fn critique(&self, prompt: &str, image_url: &str) -> Result<String, AiError> {
        let body = VisionRequest {
            model: self.config.model.clone(),
            input: vec![VisionMessage {
                role: "user",
                content: vec![
                    VisionContent::Text {
                        text: prompt.to_string(),
                    },
                    VisionContent::Image {
                        image_url: image_url.to_string(),
                    },
                ],
            }],
            max_output_tokens: 800,
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_critique_sends_image_url_and_parses_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(body_partial_json(serde_json::json!({
                "input": [{
                    "role": "user",
                    "content": [
                        {"type": "input_text", "text": "score it"},
                        {"type": "input_image", "image_url": "https://img.example/1.png"}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": [{
                    "type": "message",
                    "content": [{"type": "output_text", "text": r#"{"overall_score": 8}"#}]
                }]
            })))
            .mount(&mock_server)
            .await;

        let vision = OpenAiVisionModel::with_base_url(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig::default(),
        )
        .unwrap();

        let text = vision
            .critique("score it", "https://img.example/1.png")
            .await
            .unwrap();
        assert_eq!(text, r#"{"overall_score": 8}"#);
    }

    #[tokio::test]
    async fn test_critique_maps_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let vision = OpenAiVisionModel::with_base_url(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig::default(),
        )
        .unwrap();

        let result = vision.critique("p", "https://img.example/1.png").await;
        assert!(matches!(result, Err(AiError::Api(_))));
    }
}
