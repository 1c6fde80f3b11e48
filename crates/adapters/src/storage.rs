//! Bucket-style object storage adapter

use async_trait::async_trait;
use newsflow_domain::{ObjectStore, StorageError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Object store speaking the Supabase-compatible storage REST API.
/// Uploaded objects are served from the public bucket URL.
pub struct BucketStore {
    client: Client,
    base_url: String,
    api_key: SecretString,
    bucket: String,
}

impl BucketStore {
    pub fn new(
        base_url: String,
        api_key: SecretString,
        bucket: String,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            bucket,
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn try_upload(
        &self,
        bytes: &[u8],
        path: &str,
        content_type: &str,
    ) -> Result<reqwest::StatusCode, StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(response.status())
    }

    async fn create_bucket(&self) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/bucket", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&serde_json::json!({
                "name": self.bucket,
                "id": self.bucket,
                "public": true
            }))
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        // 409 means the bucket already exists, which is fine
        let status = response.status();
        if !status.is_success() && status != 409 {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api(format!(
                "Bucket creation returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for BucketStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let status = self.try_upload(&bytes, path, content_type).await?;
        if status.is_success() {
            return Ok(self.public_url(path));
        }

        // First upload into a fresh project hits a missing bucket
        if status == 404 {
            tracing::info!(bucket = %self.bucket, "Bucket missing, creating it");
            self.create_bucket().await?;
            let retry_status = self.try_upload(&bytes, path, content_type).await?;
            if retry_status.is_success() {
                return Ok(self.public_url(path));
            }
            return Err(StorageError::Api(format!(
                "Upload after bucket creation returned {}",
                retry_status
            )));
        }

        Err(StorageError::Api(format!("Upload returned {}", status)))
    }

    async fn mirror(&self, source_url: &str, path: &str) -> Result<String, StorageError> {
        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::Api(format!(
                "Source fetch returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        self.upload(bytes.to_vec(), path, &content_type).await
    }
}

/// Object store used when no bucket is configured. Mirroring hands back the
/// source URL unchanged; uploads are rejected.
#[derive(Default)]
pub struct PassthroughStore;

#[async_trait]
impl ObjectStore for PassthroughStore {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        _path: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        Err(StorageError::Api("Object storage is not configured".to_string()))
    }

    async fn mirror(&self, source_url: &str, _path: &str) -> Result<String, StorageError> {
        Ok(source_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> BucketStore {
        BucketStore::new(
            server.uri(),
            SecretString::new("service-key".into()),
            "media".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/items/1/cover.jpg"))
            .and(header("Authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let url = store(&mock_server)
            .upload(vec![1, 2, 3], "items/1/cover.jpg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/media/items/1/cover.jpg",
                mock_server.uri()
            )
        );
    }

    #[tokio::test]
    async fn test_upload_creates_bucket_on_first_miss() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/a.png"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/bucket"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/a.png"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let url = store(&mock_server)
            .upload(vec![0], "a.png", "image/png")
            .await
            .unwrap();

        assert!(url.ends_with("/media/a.png"));
    }

    #[tokio::test]
    async fn test_mirror_copies_remote_object() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/remote/photo.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![9, 9, 9])
                    .insert_header("Content-Type", "image/jpeg"),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/mirrored/photo.jpg"))
            .and(header("Content-Type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let source = format!("{}/remote/photo.jpg", mock_server.uri());
        let url = store(&mock_server)
            .mirror(&source, "mirrored/photo.jpg")
            .await
            .unwrap();

        assert!(url.contains("/public/media/mirrored/photo.jpg"));
    }

    #[tokio::test]
    async fn test_mirror_fails_when_source_is_gone() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/remote/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let source = format!("{}/remote/gone.jpg", mock_server.uri());
        let result = store(&mock_server).mirror(&source, "x.jpg").await;

        assert!(matches!(result, Err(StorageError::Api(_))));
    }
}
