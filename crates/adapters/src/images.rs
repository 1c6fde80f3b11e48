//! OpenAI image generation adapter

use async_trait::async_trait;
use newsflow_domain::{ImageRenderer, RenderImageError, RenderedImage};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub model: String,
    /// Landscape by default to suit article headers
    pub size: String,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1792x1024".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Renderer backed by the OpenAI image generation endpoint
pub struct OpenAiImageRenderer {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: ImageConfig,
}

impl OpenAiImageRenderer {
    pub fn new(api_key: SecretString, config: ImageConfig) -> Result<Self, RenderImageError> {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: ImageConfig,
    ) -> Result<Self, RenderImageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RenderImageError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            config,
        })
    }
}

#[derive(Serialize)]
struct GenerationRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: String,
}

#[async_trait]
impl ImageRenderer for OpenAiImageRenderer {
    async fn render(&self, prompt: &str) -> Result<RenderedImage, RenderImageError> {
        let body = GenerationRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.config.size.clone(),
            response_format: "url",
        };

        let url = format!("{}/images/generations", self.base_url);

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
                    RenderImageError::Timeout
                } else {
                    RenderImageError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 400s from this endpoint are almost always safety rejections
            if status == 400 {
                return Err(RenderImageError::PromptRejected(body));
            }
            return Err(RenderImageError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .map_err(|e| RenderImageError::Api(e.to_string()))?;

        let image = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RenderImageError::Api("Empty image response".to_string()))?;

        Ok(RenderedImage { url: image.url })
    }
}

/// Renderer returning a fixed placeholder, paired with the stub AI models
/// for offline runs
pub struct StubRenderer;

#[async_trait]
impl ImageRenderer for StubRenderer {
    async fn render(&self, prompt: &str) -> Result<RenderedImage, RenderImageError> {
        tracing::debug!(prompt_len = prompt.len(), "Stub render");
        Ok(RenderedImage {
            url: "https://placehold.example/1792x1024.png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn renderer(server: &MockServer) -> OpenAiImageRenderer {
        OpenAiImageRenderer::with_base_url(
            SecretString::new("test-key".into()),
            server.uri(),
            ImageConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_render_returns_image_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(body_partial_json(serde_json::json!({
                "prompt": "a lighthouse made of newspapers",
                "n": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": "https://img.example/out.png"}]
            })))
            .mount(&mock_server)
            .await;

        let image = renderer(&mock_server)
            .render("a lighthouse made of newspapers")
            .await
            .unwrap();

        assert_eq!(image.url, "https://img.example/out.png");
    }

    #[tokio::test]
    async fn test_render_maps_safety_rejection() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_string("content policy"))
            .mount(&mock_server)
            .await;

        let result = renderer(&mock_server).render("prompt").await;
        assert!(matches!(result, Err(RenderImageError::PromptRejected(_))));
    }

    #[tokio::test]
    async fn test_render_empty_data_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})),
            )
            .mount(&mock_server)
            .await;

        let result = renderer(&mock_server).render("prompt").await;
        assert!(matches!(result, Err(RenderImageError::Api(_))));
    }
}
