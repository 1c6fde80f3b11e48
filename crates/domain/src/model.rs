//! Domain models and value objects

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// A content language supported by the pipeline
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (the fallback base language)
    #[default]
    En,
    /// Norwegian
    No,
    /// Ukrainian
    Ua,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::No => "no",
            Language::Ua => "ua",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::No => "Norwegian",
            Language::Ua => "Ukrainian",
        }
    }

    pub fn all() -> &'static [Language] {
        &[Language::En, Language::No, Language::Ua]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "no" | "nb" => Ok(Language::No),
            "ua" | "uk" => Ok(Language::Ua),
            other => Err(format!("Unknown language code: {}", other)),
        }
    }
}

/// One language's rendition of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageVariant {
    pub title: String,
    pub body: String,
    pub short_description: String,
    /// URL slug derived from the title
    pub slug: String,
}

/// Where a raw item came from; carries the stable dedup identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Telegram { channel: String, message_id: i64 },
    Rss { feed_url: String },
}

/// A normalized item pulled from an ingestion source, before any AI work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// Canonical URL of the original article/post
    pub url: String,
    pub title: String,
    pub body: String,
    /// Source media URLs (images or video), possibly ephemeral
    pub image_urls: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub source: SourceRef,
}

impl RawItem {
    /// Canonical dedup key: a sha256 over the stable source identity.
    /// Telegram items key on channel+message, everything else on the URL.
    pub fn dedup_key(&self) -> String {
        let identity = match &self.source {
            SourceRef::Telegram {
                channel,
                message_id,
            } => format!("telegram:{}:{}", channel, message_id),
            SourceRef::Rss { .. } => format!("url:{}", self.url.trim_end_matches('/')),
        };

        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Unpublished,
    Published,
}

/// Generation approach chosen by the image pre-analysis step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageApproach {
    /// Templated prompt from a structured article classification (safest)
    #[default]
    Structured,
    /// Free-form creative prose prompt
    Creative,
    /// Photographic hero shot
    HeroImage,
    /// Painterly / illustrative
    Artistic,
}

impl ImageApproach {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageApproach::Structured => "structured",
            ImageApproach::Creative => "creative",
            ImageApproach::HeroImage => "hero_image",
            ImageApproach::Artistic => "artistic",
        }
    }
}

/// One proposed image concept from the variant-proposal step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub label: String,
    pub description: String,
}

/// Illustrative-image state for a content item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemImage {
    pub generation_prompt: String,
    pub approach_used: ImageApproach,
    #[serde(default)]
    pub variants_offered: Vec<ImageVariant>,
    #[serde(default)]
    pub selected_variant: Option<ImageVariant>,
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub validation_issues: Vec<String>,
    pub url: Option<String>,
    /// Number of generation attempts, including retries triggered by the critic
    pub attempts: u32,
}

/// A social platform the pipeline can distribute to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    LinkedIn,
    Facebook,
    Instagram,
    TikTok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }

    /// Platform caption limit in characters
    pub fn max_caption_chars(&self) -> usize {
        match self {
            Platform::LinkedIn => 3000,
            Platform::Facebook => 63_206,
            Platform::Instagram => 2200,
            Platform::TikTok => 2200,
        }
    }

    pub fn all() -> &'static [Platform] {
        &[
            Platform::LinkedIn,
            Platform::Facebook,
            Platform::Instagram,
            Platform::TikTok,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(Platform::LinkedIn),
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SocialPostStatus {
    #[default]
    Pending,
    Posted,
    Failed,
}

/// One attempt to publish a content item to one platform in one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: Uuid,
    pub content_item_id: Uuid,
    pub platform: Platform,
    pub language: Language,
    pub status: SocialPostStatus,
    pub external_post_id: Option<String>,
    pub post_url: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SocialPost {
    pub fn pending(
        content_item_id: Uuid,
        platform: Platform,
        language: Language,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_item_id,
            platform,
            language,
            status: SocialPostStatus::Pending,
            external_post_id: None,
            post_url: None,
            error_message: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Question,
    Spam,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Question => "question",
            Sentiment::Spam => "spam",
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "question" => Ok(Sentiment::Question),
            "spam" => Ok(Sentiment::Spam),
            other => Err(format!("Unknown sentiment: {}", other)),
        }
    }
}

/// One audience comment on a social post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub social_post_id: Uuid,
    pub platform: Platform,
    /// Platform-side comment ID, used for dedup
    pub external_comment_id: String,
    pub author: String,
    pub text: String,
    pub sentiment: Sentiment,
    pub is_read: bool,
    pub is_replied: bool,
    pub is_hidden: bool,
    /// AI-drafted reply, generated lazily and never auto-sent
    pub suggested_reply: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Reference to a message in the moderation channel, kept for status edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessageRef {
    pub chat_id: String,
    pub message_id: i64,
}

/// The central entity: one ingested article moving through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub source: SourceRef,
    pub dedup_key: String,
    pub original_title: String,
    pub original_body: String,
    /// Canonical URL of the original article/post
    pub source_url: String,
    /// Source media URLs carried over from ingestion
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub language_variants: BTreeMap<Language, LanguageVariant>,
    pub moderation_status: ModerationStatus,
    pub rejection_reason: Option<String>,
    pub publish_status: PublishStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub image: Option<ItemImage>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Moderation-channel message for this item, if one was sent
    pub moderation_message: Option<ChannelMessageRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ContentItem {
    /// Create a fresh item from an ingested raw item. Called exactly once per
    /// dedup key; the store's unique constraint backs that up.
    pub fn from_raw(raw: &RawItem, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            dedup_key: raw.dedup_key(),
            source: raw.source.clone(),
            original_title: raw.title.clone(),
            original_body: raw.body.clone(),
            source_url: raw.url.clone(),
            media_urls: raw.image_urls.clone(),
            language_variants: BTreeMap::new(),
            moderation_status: ModerationStatus::Pending,
            rejection_reason: None,
            publish_status: PublishStatus::Unpublished,
            published_at: None,
            image: None,
            tags: Vec::new(),
            moderation_message: None,
            created_at: now,
        }
    }

    /// Look up a language variant with the English fallback chain:
    /// requested language first, then English. Returns None only when not
    /// even the English variant exists (i.e. before the rewrite stage ran).
    pub fn variant(&self, language: Language) -> Option<&LanguageVariant> {
        self.language_variants
            .get(&language)
            .or_else(|| self.language_variants.get(&Language::En))
    }

    pub fn is_published(&self) -> bool {
        self.publish_status == PublishStatus::Published
    }
}

/// Processing result for a single ingested item
#[derive(Debug)]
pub enum ItemOutcome {
    /// Item advanced through the pipeline (possibly awaiting human approval)
    Processed {
        item_id: Uuid,
        published: bool,
        posts_attempted: usize,
    },
    /// Item was skipped (duplicate, rejected, etc.)
    Skipped { reason: String },
    /// Processing failed before the item could advance
    Failed { error: String },
}
