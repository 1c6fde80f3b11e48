//! Stub publisher for dry runs

use async_trait::async_trait;
use newsflow_domain::{
    ContainerStatus, Platform, PlatformComment, PostHandle, PublishError, SocialPublisher,
};
use std::sync::Mutex;
use uuid::Uuid;

/// Publisher that records captions instead of calling any platform.
/// Used by dry-run mode so the whole pipeline can execute without credentials.
pub struct StubPublisher {
    platform: Platform,
    published: Mutex<Vec<String>>,
}

impl StubPublisher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published_captions(&self) -> Vec<String> {
        self.published
            .lock()
            .map(|captions| captions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SocialPublisher for StubPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn create_container(
        &self,
        _media_url: Option<&str>,
        caption: &str,
    ) -> Result<String, PublishError> {
        tracing::info!(platform = self.platform.as_str(), "Dry-run container");
        if let Ok(mut published) = self.published.lock() {
            published.push(caption.to_string());
        }
        Ok(Uuid::new_v4().to_string())
    }

    async fn container_status(&self, _container_id: &str) -> Result<ContainerStatus, PublishError> {
        Ok(ContainerStatus::Ready)
    }

    async fn publish_container(&self, container_id: &str) -> Result<PostHandle, PublishError> {
        Ok(PostHandle {
            external_id: format!("stub-{}", container_id),
            url: None,
        })
    }

    async fn fetch_comments(
        &self,
        _external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError> {
        Ok(Vec::new())
    }

    async fn reply_to_comment(
        &self,
        _external_comment_id: &str,
        _text: &str,
    ) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_records_captions() {
        let publisher = StubPublisher::new(Platform::Instagram);

        let container_id = publisher
            .create_container(None, "first caption")
            .await
            .unwrap();
        let status = publisher.container_status(&container_id).await.unwrap();
        let handle = publisher.publish_container(&container_id).await.unwrap();

        assert_eq!(status, ContainerStatus::Ready);
        assert!(handle.external_id.starts_with("stub-"));
        assert_eq!(publisher.published_captions(), vec!["first caption"]);
    }
}
