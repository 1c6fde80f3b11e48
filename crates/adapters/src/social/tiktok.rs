//! TikTok publisher via the Content Posting API
//!
//! Direct-post mode: the init call both creates the upload and schedules
//! publication, so `publish_container` only confirms completion and reads
//! the final post ID. The Content Posting API does not expose comment
//! management, so comment sync yields nothing for this platform.

use async_trait::async_trait;
use newsflow_domain::{
    ContainerStatus, Platform, PlatformComment, PostHandle, PublishError, SocialPublisher,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TIKTOK_BASE_URL: &str = "https://open.tiktokapis.com";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TikTokConfig {
    pub enabled: bool,
}

pub struct TikTokPublisher {
    client: Client,
    base_url: String,
    access_token: SecretString,
    config: TikTokConfig,
}

impl TikTokPublisher {
    pub fn new(access_token: SecretString, config: TikTokConfig) -> Result<Self, PublishError> {
        Self::with_base_url(access_token, TIKTOK_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        access_token: SecretString,
        base_url: String,
        config: TikTokConfig,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            access_token,
            config,
        })
    }

    async fn call(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, PublishError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(
                "Authorization",
                format!("Bearer {}", self.access_token.expose_secret()),
            )
            .json(body)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(PublishError::RateLimited);
        }
        if status == 401 || status == 403 {
            return Err(PublishError::Auth(format!("TikTok returned {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "TikTok returned {}: {}",
                status, body
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        // Errors also arrive in a 200 envelope
        let error_code = parsed
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("ok");
        if error_code != "ok" {
            let message = parsed
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or(error_code);
            return Err(PublishError::Api(message.to_string()));
        }

        Ok(parsed)
    }

    async fn fetch_status(&self, publish_id: &str) -> Result<serde_json::Value, PublishError> {
        self.call(
            "/v2/post/publish/status/fetch/",
            &serde_json::json!({"publish_id": publish_id}),
        )
        .await
    }
}

#[async_trait]
impl SocialPublisher for TikTokPublisher {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn create_container(
        &self,
        media_url: Option<&str>,
        caption: &str,
    ) -> Result<String, PublishError> {
        let max = self.platform().max_caption_chars();
        if caption.chars().count() > max {
            return Err(PublishError::ContentTooLong {
                len: caption.chars().count(),
                max,
            });
        }

        let media_url = media_url
            .ok_or_else(|| PublishError::Api("TikTok posts require media".to_string()))?;

        let body = serde_json::json!({
            "post_info": {
                "title": caption,
                "privacy_level": "PUBLIC_TO_EVERYONE"
            },
            "source_info": {
                "source": "PULL_FROM_URL",
                "photo_cover_index": 0,
                "photo_images": [media_url]
            },
            "post_mode": "DIRECT_POST",
            "media_type": "PHOTO"
        });

        let response = self.call("/v2/post/publish/content/init/", &body).await?;

        response
            .get("data")
            .and_then(|d| d.get("publish_id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| PublishError::Api("Missing publish_id in response".to_string()))
    }

    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, PublishError> {
        let response = self.fetch_status(container_id).await?;

        let status = response
            .get("data")
            .and_then(|d| d.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN");

        Ok(match status {
            "PUBLISH_COMPLETE" => ContainerStatus::Ready,
            "PROCESSING_UPLOAD" | "PROCESSING_DOWNLOAD" | "SEND_TO_USER_INBOX" => {
                ContainerStatus::Pending
            }
            "FAILED" => {
                let reason = response
                    .get("data")
                    .and_then(|d| d.get("fail_reason"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                ContainerStatus::Error(reason.to_string())
            }
            other => {
                tracing::warn!(status = other, "Unknown publish status");
                ContainerStatus::Pending
            }
        })
    }

    async fn publish_container(&self, container_id: &str) -> Result<PostHandle, PublishError> {
        // Direct post publishes on completion; confirm and read the post ID
        let response = self.fetch_status(container_id).await?;

        let status = response
            .get("data")
            .and_then(|d| d.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN");
        if status != "PUBLISH_COMPLETE" {
            return Err(PublishError::ProcessingFailed(format!(
                "Publish status is {}",
                status
            )));
        }

        let post_id = response
            .get("data")
            .and_then(|d| d.get("publicaly_available_post_id"))
            .and_then(|v| v.as_array())
            .and_then(|ids| ids.first())
            .map(|id| match id.as_str() {
                Some(s) => s.to_string(),
                None => id.to_string(),
            })
            .unwrap_or_else(|| container_id.to_string());

        Ok(PostHandle {
            external_id: post_id,
            url: None,
        })
    }

    async fn fetch_comments(
        &self,
        _external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError> {
        tracing::debug!("Comment sync is not available for TikTok");
        Ok(Vec::new())
    }

    async fn reply_to_comment(
        &self,
        _external_comment_id: &str,
        _text: &str,
    ) -> Result<(), PublishError> {
        Err(PublishError::Api(
            "Comment replies are not available for TikTok".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> TikTokPublisher {
        TikTokPublisher::with_base_url(
            SecretString::new("token".into()),
            server.uri(),
            TikTokConfig { enabled: true },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_container_inits_direct_post() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/post/publish/content/init/"))
            .and(body_partial_json(serde_json::json!({
                "post_mode": "DIRECT_POST",
                "source_info": {"source": "PULL_FROM_URL"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"publish_id": "pub-1"},
                "error": {"code": "ok"}
            })))
            .mount(&mock_server)
            .await;

        let publish_id = publisher(&mock_server)
            .create_container(Some("https://img.example/a.jpg"), "caption")
            .await
            .unwrap();

        assert_eq!(publish_id, "pub-1");
    }

    #[tokio::test]
    async fn test_envelope_error_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/post/publish/content/init/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {},
                "error": {"code": "spam_risk_too_many_posts", "message": "Daily post cap reached"}
            })))
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server)
            .create_container(Some("https://img.example/a.jpg"), "caption")
            .await;

        match result {
            Err(PublishError::Api(message)) => assert!(message.contains("cap")),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_container_status_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/post/publish/status/fetch/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"status": "PROCESSING_DOWNLOAD"},
                "error": {"code": "ok"}
            })))
            .mount(&mock_server)
            .await;

        let status = publisher(&mock_server).container_status("pub-1").await.unwrap();
        assert_eq!(status, ContainerStatus::Pending);
    }

    #[tokio::test]
    async fn test_failed_status_carries_reason() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/post/publish/status/fetch/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"status": "FAILED", "fail_reason": "photo_pull_failed"},
                "error": {"code": "ok"}
            })))
            .mount(&mock_server)
            .await;

        let status = publisher(&mock_server).container_status("pub-1").await.unwrap();
        assert_eq!(
            status,
            ContainerStatus::Error("photo_pull_failed".to_string())
        );
    }

    #[tokio::test]
    async fn test_publish_container_reads_post_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/post/publish/status/fetch/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "status": "PUBLISH_COMPLETE",
                    "publicaly_available_post_id": ["7300000001"]
                },
                "error": {"code": "ok"}
            })))
            .mount(&mock_server)
            .await;

        let handle = publisher(&mock_server).publish_container("pub-1").await.unwrap();
        assert_eq!(handle.external_id, "7300000001");
    }

    #[tokio::test]
    async fn test_fetch_comments_is_empty() {
        let mock_server = MockServer::start().await;
        let comments = publisher(&mock_server).fetch_comments("x").await.unwrap();
        assert!(comments.is_empty());
    }
}
