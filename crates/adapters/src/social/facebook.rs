//! Facebook page publisher via the Graph API
//!
//! Facebook publishing is immediate. To fit the container flow the adapter
//! stashes the pending post locally at container creation and performs the
//! real API call on publish; the container is ready as soon as it exists.

use async_trait::async_trait;
use newsflow_domain::{
    ContainerStatus, Platform, PlatformComment, PostHandle, PublishError, SocialPublisher,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::graph::{GRAPH_BASE_URL, GraphClient, string_field};
use super::instagram::parse_graph_time;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FacebookConfig {
    pub enabled: bool,
    pub page_id: String,
}

struct PendingPost {
    media_url: Option<String>,
    caption: String,
}

pub struct FacebookPublisher {
    graph: GraphClient,
    config: FacebookConfig,
    pending: Mutex<HashMap<String, PendingPost>>,
}

impl FacebookPublisher {
    pub fn new(access_token: SecretString, config: FacebookConfig) -> Result<Self, PublishError> {
        Self::with_base_url(access_token, GRAPH_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        access_token: SecretString,
        base_url: String,
        config: FacebookConfig,
    ) -> Result<Self, PublishError> {
        Ok(Self {
            graph: GraphClient::new(base_url, access_token)?,
            config,
            pending: Mutex::new(HashMap::new()),
        })
    }

    fn take_pending(&self, container_id: &str) -> Result<PendingPost, PublishError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| PublishError::Api("Pending post lock poisoned".to_string()))?;
        pending
            .remove(container_id)
            .ok_or_else(|| PublishError::Api(format!("Unknown container: {}", container_id)))
    }
}

#[async_trait]
impl SocialPublisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
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

        let container_id = Uuid::new_v4().to_string();
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| PublishError::Api("Pending post lock poisoned".to_string()))?;
        pending.insert(
            container_id.clone(),
            PendingPost {
                media_url: media_url.map(|s| s.to_string()),
                caption: caption.to_string(),
            },
        );

        Ok(container_id)
    }

    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, PublishError> {
        let pending = self
            .pending
            .lock()
            .map_err(|_| PublishError::Api("Pending post lock poisoned".to_string()))?;
        if pending.contains_key(container_id) {
            Ok(ContainerStatus::Ready)
        } else {
            Ok(ContainerStatus::Error(format!(
                "Unknown container: {}",
                container_id
            )))
        }
    }

    async fn publish_container(&self, container_id: &str) -> Result<PostHandle, PublishError> {
        let post = self.take_pending(container_id)?;

        let response = match &post.media_url {
            Some(media_url) => {
                let path = format!("{}/photos", self.config.page_id);
                self.graph
                    .post(
                        &path,
                        &[("url", media_url.as_str()), ("caption", &post.caption)],
                    )
                    .await?
            }
            None => {
                let path = format!("{}/feed", self.config.page_id);
                self.graph
                    .post(&path, &[("message", post.caption.as_str())])
                    .await?
            }
        };

        // Photo posts answer with post_id, feed posts with id
        let post_id = string_field(&response, "post_id")
            .or_else(|_| string_field(&response, "id"))?;

        Ok(PostHandle {
            url: Some(format!("https://www.facebook.com/{}", post_id)),
            external_id: post_id,
        })
    }

    async fn fetch_comments(
        &self,
        external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError> {
        let path = format!("{}/comments", external_post_id);
        let response = self
            .graph
            .get(&path, &[("fields", "id,from,message,created_time")])
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
                                .get("from")
                                .and_then(|f| f.get("name"))
                                .and_then(|v| v.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            text: item.get("message")?.as_str()?.to_string(),
                            created_at: parse_graph_time(
                                item.get("created_time").and_then(|v| v.as_str()),
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
        let path = format!("{}/comments", external_comment_id);
        self.graph.post(&path, &[("message", text)]).await?;
        Ok(())
    }
}
