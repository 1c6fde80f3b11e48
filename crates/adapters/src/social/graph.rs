//! Shared client for the Meta Graph API (Facebook and Instagram)

use newsflow_domain::PublishError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

pub(super) const GRAPH_BASE_URL: &str = "https://graph.facebook.com/v21.0";

pub(super) struct GraphClient {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
    #[serde(default)]
    code: i64,
}

impl GraphClient {
    pub(super) fn new(base_url: String, access_token: SecretString) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    pub(super) async fn post(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, PublishError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut form: Vec<(&str, &str)> = params.to_vec();
        let token = self.access_token.expose_secret().to_string();
        form.push(("access_token", token.as_str()));

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Self::parse(response).await
    }

    pub(super) async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, PublishError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = params.to_vec();
        let token = self.access_token.expose_secret().to_string();
        query.push(("access_token", token.as_str()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> Result<serde_json::Value, PublishError> {
        let status = response.status();

        if status == 429 {
            return Err(PublishError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<GraphErrorBody>(&body) {
                // Code 190 covers expired and invalid tokens
                if parsed.error.code == 190 || status == 401 {
                    return Err(PublishError::Auth(parsed.error.message));
                }
                // Graph reports throttling as code 4/17/32 with status 400
                if matches!(parsed.error.code, 4 | 17 | 32) {
                    return Err(PublishError::RateLimited);
                }
                return Err(PublishError::Api(parsed.error.message));
            }
            return Err(PublishError::Api(format!(
                "Graph API returned {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| PublishError::Api(e.to_string()))
    }
}

/// Pull a string field out of a Graph response object
pub(super) fn string_field(value: &serde_json::Value, field: &str) -> Result<String, PublishError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| PublishError::Api(format!("Missing field '{}' in response", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(server.uri(), SecretString::new("token".into())).unwrap()
    }

    #[tokio::test]
    async fn test_expired_token_maps_to_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Error validating access token", "code": 190}
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).post("me/feed", &[]).await;
        assert!(matches!(result, Err(PublishError::Auth(_))));
    }

    #[tokio::test]
    async fn test_throttle_code_maps_to_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Application request limit reached", "code": 4}
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).post("me/feed", &[]).await;
        assert!(matches!(result, Err(PublishError::RateLimited)));
    }

    #[tokio::test]
    async fn test_string_field_extraction() {
        let value = serde_json::json!({"id": "123_456"});
        assert_eq!(string_field(&value, "id").unwrap(), "123_456");
        assert!(string_field(&value, "missing").is_err());
    }
}
