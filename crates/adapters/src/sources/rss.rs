//! RSS/Atom feed source

use async_trait::async_trait;
use newsflow_domain::{ItemSource, RawItem, SourceError, SourceRef};
use reqwest::Client;
use std::time::Duration;
use time::OffsetDateTime;

/// Pulls items from a single RSS or Atom feed
pub struct RssSource {
    client: Client,
    feed_url: String,
    source_id: String,
}

impl RssSource {
    pub fn new(feed_url: String) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("newsflow/0.1")
            .build()
            .map_err(|e| SourceError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let source_id = format!("rss:{}", feed_url);
        Ok(Self {
            client,
            feed_url,
            source_id,
        })
    }
}

#[async_trait]
impl ItemSource for RssSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "Feed returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let feed = feed_rs::parser::parse(&bytes[..])
            .map_err(|e| SourceError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut items = Vec::new();
        for entry in feed.entries {
            match self.parse_entry(entry) {
                Some(item) => items.push(item),
                None => tracing::debug!(source = %self.source_id, "Skipping entry without a link"),
            }
        }

        tracing::debug!(source = %self.source_id, count = items.len(), "Fetched feed items");
        Ok(items)
    }
}

impl RssSource {
    fn parse_entry(&self, entry: feed_rs::model::Entry) -> Option<RawItem> {
        let url = entry.links.first()?.href.clone();

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());

        // Prefer full content over the summary when both are present
        let body = entry
            .content
            .and_then(|c| c.body)
            .or_else(|| entry.summary.map(|s| s.content))
            .unwrap_or_default();

        let mut image_urls = Vec::new();
        for media in &entry.media {
            for content in &media.content {
                if let Some(url) = &content.url {
                    image_urls.push(url.to_string());
                }
            }
            for thumbnail in &media.thumbnails {
                image_urls.push(thumbnail.image.uri.clone());
            }
        }

        let published_at = entry
            .published
            .or(entry.updated)
            .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.timestamp()).ok())
            .unwrap_or_else(OffsetDateTime::now_utc);

        Some(RawItem {
            url,
            title,
            body,
            image_urls,
            published_at,
            source: SourceRef::Rss {
                feed_url: self.feed_url.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example News</title>
    <item>
      <title>First story</title>
      <link>https://news.example/first</link>
      <description>Something happened.</description>
      <pubDate>Mon, 24 Aug 2026 10:00:00 GMT</pubDate>
      <media:thumbnail url="https://news.example/first.jpg"/>
    </item>
    <item>
      <title>Second story</title>
      <link>https://news.example/second</link>
      <description>Something else.</description>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn test_fetch_items_parses_feed_entries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SAMPLE_FEED)
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&mock_server)
            .await;

        let source = RssSource::new(format!("{}/feed.xml", mock_server.uri())).unwrap();
        let items = source.fetch_items().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First story");
        assert_eq!(items[0].url, "https://news.example/first");
        assert_eq!(items[0].body, "Something happened.");
        assert_eq!(items[0].image_urls, vec!["https://news.example/first.jpg"]);
        assert!(matches!(items[0].source, SourceRef::Rss { .. }));
    }

    #[tokio::test]
    async fn test_fetch_items_maps_http_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let source = RssSource::new(format!("{}/feed.xml", mock_server.uri())).unwrap();
        let result = source.fetch_items().await;

        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_items_rejects_non_feed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        let source = RssSource::new(format!("{}/feed.xml", mock_server.uri())).unwrap();
        let result = source.fetch_items().await;

        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_dedup_key_stable_for_same_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FEED))
            .mount(&mock_server)
            .await;

        let source = RssSource::new(format!("{}/feed.xml", mock_server.uri())).unwrap();
        let first = source.fetch_items().await.unwrap();
        let second = source.fetch_items().await.unwrap();

        assert_eq!(first[0].dedup_key(), second[0].dedup_key());
        assert_ne!(first[0].dedup_key(), first[1].dedup_key());
    }
}
