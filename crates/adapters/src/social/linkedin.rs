//! LinkedIn organization page publisher
//!
//! Uses the versioned LinkedIn REST API. Publishing is immediate, so the
//! adapter uses the same local stash as the Facebook one. Posts are text
//! commentary; the article link travels inside the caption.

use async_trait::async_trait;
use newsflow_domain::{
    ContainerStatus, Platform, PlatformComment, PostHandle, PublishError, SocialPublisher,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

const LINKEDIN_BASE_URL: &str = "https://api.linkedin.com";
const LINKEDIN_VERSION: &str = "202408";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkedInConfig {
    pub enabled: bool,
    /// Numeric organization ID
    pub organization_id: String,
}

pub struct LinkedInPublisher {
    client: Client,
    base_url: String,
    access_token: SecretString,
    config: LinkedInConfig,
    pending: Mutex<HashMap<String, String>>,
}

impl LinkedInPublisher {
    pub fn new(access_token: SecretString, config: LinkedInConfig) -> Result<Self, PublishError> {
        Self::with_base_url(access_token, LINKEDIN_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        access_token: SecretString,
        base_url: String,
        config: LinkedInConfig,
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
            pending: Mutex::new(HashMap::new()),
        })
    }

    fn author_urn(&self) -> String {
        format!("urn:li:organization:{}", self.config.organization_id)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(
                "Authorization",
                format!("Bearer {}", self.access_token.expose_secret()),
            )
            .header("LinkedIn-Version", LINKEDIN_VERSION)
            .header("X-Restli-Protocol-Version", "2.0.0")
    }

    async fn check_status(response: &reqwest::Response) -> Result<(), PublishError> {
        let status = response.status();
        if status == 429 {
            return Err(PublishError::RateLimited);
        }
        if status == 401 || status == 403 {
            return Err(PublishError::Auth(format!("LinkedIn returned {}", status)));
        }
        Ok(())
    }
}

#[async_trait]
impl SocialPublisher for LinkedInPublisher {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn create_container(
        &self,
        _media_url: Option<&str>,
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
        pending.insert(container_id.clone(), caption.to_string());

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
        let caption = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| PublishError::Api("Pending post lock poisoned".to_string()))?;
            pending
                .remove(container_id)
                .ok_or_else(|| PublishError::Api(format!("Unknown container: {}", container_id)))?
        };

        let body = serde_json::json!({
            "author": self.author_urn(),
            "commentary": caption,
            "visibility": "PUBLIC",
            "distribution": {
                "feedDistribution": "MAIN_FEED",
                "targetEntities": [],
                "thirdPartyDistributionChannels": []
            },
            "lifecycleState": "PUBLISHED",
            "isReshareDisabledByAuthor": false
        });

        let response = self
            .request(reqwest::Method::POST, format!("{}/rest/posts", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Self::check_status(&response).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "LinkedIn returned {}: {}",
                status, body
            )));
        }

        // The created post URN comes back in a response header
        let post_urn = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| PublishError::Api("Missing x-restli-id header".to_string()))?;

        Ok(PostHandle {
            url: Some(format!(
                "https://www.linkedin.com/feed/update/{}",
                post_urn
            )),
            external_id: post_urn,
        })
    }

    async fn fetch_comments(
        &self,
        external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError> {
        let url = format!(
            "{}/rest/socialActions/{}/comments",
            self.base_url, external_post_id
        );

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Self::check_status(&response).await?;
        if !response.status().is_success() {
            return Err(PublishError::Api(format!(
                "LinkedIn returned {}",
                response.status()
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let comments = parsed
            .get("elements")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let created_at = item
                            .get("created")
                            .and_then(|c| c.get("time"))
                            .and_then(|v| v.as_i64())
                            .and_then(|ms| OffsetDateTime::from_unix_timestamp(ms / 1000).ok())
                            .unwrap_or_else(OffsetDateTime::now_utc);

                        Some(PlatformComment {
                            external_id: item.get("commentUrn")?.as_str()?.to_string(),
                            author: item
                                .get("actor")
                                .and_then(|v| v.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            text: item
                                .get("message")?
                                .get("text")?
                                .as_str()?
                                .to_string(),
                            created_at,
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
        let url = format!(
            "{}/rest/socialActions/{}/comments",
            self.base_url, external_comment_id
        );

        let body = serde_json::json!({
            "actor": self.author_urn(),
            "message": {"text": text}
        });

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Self::check_status(&response).await?;
        if !response.status().is_success() {
            return Err(PublishError::Api(format!(
                "LinkedIn returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> LinkedInPublisher {
        LinkedInPublisher::with_base_url(
            SecretString::new("token".into()),
            server.uri(),
            LinkedInConfig {
                enabled: true,
                organization_id: "12345".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_publish_posts_commentary_and_reads_urn_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/posts"))
            .and(header("LinkedIn-Version", LINKEDIN_VERSION))
            .and(body_partial_json(serde_json::json!({
                "author": "urn:li:organization:12345",
                "commentary": "caption"
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-restli-id", "urn:li:share:6789"),
            )
            .mount(&mock_server)
            .await;

        let publisher = publisher(&mock_server);
        let container_id = publisher.create_container(None, "caption").await.unwrap();
        let handle = publisher.publish_container(&container_id).await.unwrap();

        assert_eq!(handle.external_id, "urn:li:share:6789");
        assert_eq!(
            handle.url.as_deref(),
            Some("https://www.linkedin.com/feed/update/urn:li:share:6789")
        );
    }

    #[tokio::test]
    async fn test_rejects_caption_over_limit() {
        let mock_server = MockServer::start().await;
        let caption = "x".repeat(3001);

        let result = publisher(&mock_server).create_container(None, &caption).await;
        assert!(matches!(
            result,
            Err(PublishError::ContentTooLong { len: 3001, max: 3000 })
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_maps_to_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/posts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let publisher = publisher(&mock_server);
        let container_id = publisher.create_container(None, "caption").await.unwrap();
        let result = publisher.publish_container(&container_id).await;

        assert!(matches!(result, Err(PublishError::Auth(_))));
    }

    #[tokio::test]
    async fn test_fetch_comments_parses_elements() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/socialActions/urn:li:share:6789/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "elements": [
                    {
                        "commentUrn": "urn:li:comment:(urn:li:share:6789,100)",
                        "actor": "urn:li:person:abc",
                        "message": {"text": "Nice work"},
                        "created": {"time": 1787910000000_i64}
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let comments = publisher(&mock_server)
            .fetch_comments("urn:li:share:6789")
            .await
            .unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "Nice work");
        assert_eq!(comments[0].author, "urn:li:person:abc");
    }
}
