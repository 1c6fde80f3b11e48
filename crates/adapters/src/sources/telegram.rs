//! Telegram public channel source
//!
//! Reads the web preview page at `https://t.me/s/<channel>`, which works
//! without API credentials for public channels.

use async_trait::async_trait;
use newsflow_domain::{ItemSource, RawItem, SourceError, SourceRef};
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub struct TelegramSource {
    client: Client,
    base_url: String,
    channel: String,
    source_id: String,
    message_id: Regex,
    message_text: Regex,
    background_image: Regex,
    timestamp: Regex,
    tag: Regex,
}

impl TelegramSource {
    pub fn new(channel: String) -> Result<Self, SourceError> {
        Self::with_base_url(channel, "https://t.me".to_string())
    }

    pub fn with_base_url(channel: String, base_url: String) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("newsflow/0.1")
            .build()
            .map_err(|e| SourceError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let source_id = format!("telegram:{}", channel);
        Ok(Self {
            client,
            base_url,
            channel,
            source_id,
            message_id: compile(r#"data-post="[^"]*/(\d+)""#)?,
            message_text: compile(
                r#"(?s)<div class="tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#,
            )?,
            background_image: compile(r#"background-image:url\('([^']+)'\)"#)?,
            timestamp: compile(r#"<time datetime="([^"]+)""#)?,
            tag: compile(r"<[^>]+>")?,
        })
    }

    fn parse_message(&self, block: &str) -> Option<RawItem> {
        let message_id: i64 = self
            .message_id
            .captures(block)?
            .get(1)?
            .as_str()
            .parse()
            .ok()?;

        let raw_text = self.message_text.captures(block)?.get(1)?.as_str();
        let text = self.clean_html(raw_text);
        if text.is_empty() {
            return None;
        }

        // The first line stands in for a headline on Telegram posts
        let title = text.lines().next().unwrap_or_default().trim().to_string();

        let image_urls: Vec<String> = self
            .background_image
            .captures_iter(block)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();

        let published_at = self
            .timestamp
            .captures(block)
            .and_then(|c| c.get(1))
            .and_then(|m| OffsetDateTime::parse(m.as_str(), &Rfc3339).ok())
            .unwrap_or_else(OffsetDateTime::now_utc);

        Some(RawItem {
            url: format!("https://t.me/{}/{}", self.channel, message_id),
            title,
            body: text,
            image_urls,
            published_at,
            source: SourceRef::Telegram {
                channel: self.channel.clone(),
                message_id,
            },
        })
    }

    fn clean_html(&self, raw: &str) -> String {
        let with_breaks = raw.replace("<br/>", "\n").replace("<br>", "\n");
        let stripped = self.tag.replace_all(&with_breaks, "");
        stripped
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .trim()
            .to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|e| SourceError::Parse(format!("Invalid pattern: {}", e)))
}

#[async_trait]
impl ItemSource for TelegramSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError> {
        let url = format!("{}/s/{}", self.base_url, self.channel);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "Channel page returned {}",
                response.status()
            )));
        }

        let page = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        // Each post lives in its own message wrap block
        let items: Vec<RawItem> = page
            .split("tgme_widget_message_wrap")
            .skip(1)
            .filter_map(|block| self.parse_message(block))
            .collect();

        if items.is_empty() && !page.contains("tgme_widget_message_wrap") {
            return Err(SourceError::Parse(
                "Page does not look like a channel preview".to_string(),
            ));
        }

        tracing::debug!(source = %self.source_id, count = items.len(), "Fetched channel posts");
        Ok(items)
    }
}
