//! Instagram publisher via the Graph API container flow

use async_trait::async_trait;
use newsflow_domain::{
    ContainerStatus, Platform, PlatformComment, PostHandle, PublishError, SocialPublisher,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::graph::{GRAPH_BASE_URL, GraphClient, string_field};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstagramConfig {
    pub enabled: bool,
    /// Instagram business account ID
    pub user_id: String,
}

/// Instagram is the one platform where the container flow is genuinely
/// asynchronous: media is downloaded and processed server-side before the
/// container can be published.
pub struct InstagramPublisher {
    graph: GraphClient,
    config: InstagramConfig,
}

impl InstagramPublisher {
    pub fn new(access_token: SecretString, config: InstagramConfig) -> Result<Self, PublishError> {
        Self::with_base_url(access_token, GRAPH_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        access_token: SecretString,
        base_url: String,
        config: InstagramConfig,
    ) -> Result<Self, PublishError> {
        Ok(Self {
            graph: GraphClient::new(base_url, access_token)?,
            config,
        })
    }
}

pub(super) fn parse_graph_time(value: Option<&str>) -> OffsetDateTime {
    value
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

#[async_trait]
impl SocialPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
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

        // Instagram requires media on every post
        let image_url = media_url
            .ok_or_else(|| PublishError::Api("Instagram posts require media".to_string()))?;

        let path = format!("{}/media", self.config.user_id);
        let response = self
            .graph
            .post(&path, &[("image_url", image_url), ("caption", caption)])
            .await?;

        string_field(&response, "id")
    }

    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, PublishError> {
        let response = self
            .graph
            .get(container_id, &[("fields", "status_code")])
            .await?;

        let status = string_field(&response, "status_code")?;
        Ok(match status.as_str() {
            "FINISHED" => ContainerStatus::Ready,
            "IN_PROGRESS" => ContainerStatus::Pending,
            "ERROR" | "EXPIRED" => ContainerStatus::Error(status),
            other => {
                tracing::warn!(status = other, "Unknown container status");
                ContainerStatus::Pending
            }
        })
    }

    async fn publish_container(&self, container_id: &str) -> Result<PostHandle, PublishError> {
        let path = format!("{}/media_publish", self.config.user_id);
        let response = self
            .graph
            .post(&path, &[("creation_id", container_id)])
            .await?;

        let media_id = string_field(&response, "id")?;

        // Permalink lookup is best-effort; the post is already live
        let url = match self.graph.get(&media_id, &[("fields", "permalink")]).await {
            Ok(media) => media
                .get("permalink")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to fetch permalink");
                None
            }
        };

        Ok(PostHandle {
            external_id: media_id,
            url,
        })
    }

    async fn fetch_comments(
        &self,
        external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError> {
        let path = format!("{}/comments", external_post_id);
        let response = self
            .graph
            .get(&path, &[("fields", "id,username,text,timestamp")])
            .await?;

        let comments = response
            .get("data")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(PlatformComment {
                            external_id: item.get("id")?.as_str()?.to_string(),
                            author: item
                                .get("username")
                                .and_then(|v| v.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            text: item.get("text")?.as_str()?.to_string(),
                            created_at: parse_graph_time(
                                item.get("timestamp").and_then(|v| v.as_str()),
                            ),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(comments)
    }

    async fn reply_to_comment(
        &self,
        external_comment_id: &str,
        text: &str,
    ) -> Result<(), PublishError> {
        let path = format!("{}/replies", external_comment_id);
        self.graph.post(&path, &[("message", text)]).await?;
        Ok(())
    }
}
