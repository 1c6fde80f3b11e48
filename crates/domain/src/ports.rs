//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    ChannelMessageRef, Comment, ContentItem, Language, Platform, RawItem, SocialPost,
};
use crate::policy::PipelinePolicy;

/// Error type for ingestion source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Port for pulling raw items from an ingestion source (RSS feed, Telegram channel)
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Stable identifier for logging and per-source scheduling
    fn source_id(&self) -> &str;

    /// Fetch the current batch of items. Per-entry parse failures are
    /// skipped inside the adapter; this fails only when the whole source is
    /// unreachable or unparseable.
    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError>;
}

/// Error type for AI model calls
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A single chat/completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.2,
            max_tokens: 1200,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Port for text-generation calls (moderation, rewriting, classification,
/// creative writing). Returns raw text; call sites parse.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, AiError>;
}

#[async_trait]
impl<C: ChatModel + ?Sized> ChatModel for &C {
    async fn complete(&self, request: ChatRequest) -> Result<String, AiError> {
        (*self).complete(request).await
    }
}

/// Port for vision-capable critique calls
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send a prompt plus a rendered image, get the model's raw text back
    async fn critique(&self, prompt: &str, image_url: &str) -> Result<String, AiError>;
}

#[async_trait]
impl<V: VisionModel + ?Sized> VisionModel for &V {
    async fn critique(&self, prompt: &str, image_url: &str) -> Result<String, AiError> {
        (*self).critique(prompt, image_url).await
    }
}

/// Error type for image rendering
#[derive(Debug, Error)]
pub enum RenderImageError {
    #[error("Render API error: {0}")]
    Api(String),
    #[error("Timeout")]
    Timeout,
    #[error("Prompt rejected: {0}")]
    PromptRejected(String),
}

/// A rendered raster image hosted at a fetchable URL
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub url: String,
}

/// Port for turning a final prompt into a raster image
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, prompt: &str) -> Result<RenderedImage, RenderImageError>;
}

#[async_trait]
impl<R: ImageRenderer + ?Sized> ImageRenderer for &R {
    async fn render(&self, prompt: &str) -> Result<RenderedImage, RenderImageError> {
        (*self).render(prompt).await
    }
}

/// Error type for social platform operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Media processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Timed out waiting for media processing")]
    ProcessingTimeout,
}

/// Status of an asynchronous media container on a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Pending,
    Ready,
    Error(String),
}

/// Result of a successful platform publish
#[derive(Debug, Clone)]
pub struct PostHandle {
    pub external_id: String,
    pub url: Option<String>,
}

/// A comment as returned by a platform API
#[derive(Debug, Clone)]
pub struct PlatformComment {
    pub external_id: String,
    pub author: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

/// Port for one social platform's publish and comment APIs, uniformly
/// modeled as create-container / poll / publish.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    fn is_enabled(&self) -> bool;

    /// Create a media container (or draft post) for later publishing
    async fn create_container(
        &self,
        media_url: Option<&str>,
        caption: &str,
    ) -> Result<String, PublishError>;

    /// Check processing status of a container
    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, PublishError>;

    /// Publish a ready container
    async fn publish_container(&self, container_id: &str) -> Result<PostHandle, PublishError>;

    /// Pull comments for a published post
    async fn fetch_comments(
        &self,
        external_post_id: &str,
    ) -> Result<Vec<PlatformComment>, PublishError>;

    /// Reply to a comment on the platform
    async fn reply_to_comment(
        &self,
        external_comment_id: &str,
        text: &str,
    ) -> Result<(), PublishError>;
}

/// Error type for the moderation channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel API error: {0}")]
    Api(String),
    #[error("Edit rejected: {0}")]
    EditRejected(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for the messaging-bot moderation channel
#[async_trait]
pub trait ModerationChannel: Send + Sync {
    /// Send a notification about an item; returns a reference for later edits
    async fn notify(&self, text: &str) -> Result<ChannelMessageRef, ChannelError>;

    /// Edit a previously sent message. Fails with `EditRejected` when the
    /// platform refuses (e.g. the message is too old).
    async fn edit_message(
        &self,
        message: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError>;

    /// Send a fresh message replying to the original, used when an edit is rejected
    async fn send_fallback(
        &self,
        reply_to: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError>;
}

#[async_trait]
impl<M: ModerationChannel + ?Sized> ModerationChannel for &M {
    async fn notify(&self, text: &str) -> Result<ChannelMessageRef, ChannelError> {
        (*self).notify(text).await
    }

    async fn edit_message(
        &self,
        message: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError> {
        (*self).edit_message(message, text).await
    }

    async fn send_fallback(
        &self,
        reply_to: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError> {
        (*self).send_fallback(reply_to, text).await
    }
}

/// Error type for object storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for public object storage (media re-hosting)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes, returning a public URL. The adapter creates the
    /// destination bucket on first use if absent.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Download a remote object and re-upload it under `path`, returning the
    /// new public URL. Used to move media off ephemeral messaging-app URLs.
    async fn mirror(&self, source_url: &str, path: &str) -> Result<String, StorageError>;
}

#[async_trait]
impl<O: ObjectStore + ?Sized> ObjectStore for &O {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        (*self).upload(bytes, path, content_type).await
    }

    async fn mirror(&self, source_url: &str, path: &str) -> Result<String, StorageError> {
        (*self).mirror(source_url, path).await
    }
}

/// Error type for state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Duplicate: {0}")]
    Duplicate(String),
}

/// Port for persisting content items, social posts, and comments
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Has this dedup key already been ingested?
    async fn dedup_exists(&self, dedup_key: &str) -> Result<bool, StateError>;

    /// Insert a new item. Fails with `Duplicate` when the dedup key is
    /// already claimed (the race backstop for parallel ingestion runs).
    async fn insert_item(&self, item: &ContentItem) -> Result<(), StateError>;

    async fn update_item(&self, item: &ContentItem) -> Result<(), StateError>;

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StateError>;

    async fn get_item_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<ContentItem>, StateError>;

    /// Upsert a social post, enforcing the invariant of at most one
    /// non-Failed post per (content_item_id, platform, language): a Pending
    /// or Failed row is superseded in place, a Posted row is never
    /// overwritten.
    async fn upsert_social_post(&self, post: &SocialPost) -> Result<(), StateError>;

    async fn get_social_post(
        &self,
        content_item_id: Uuid,
        platform: Platform,
        language: Language,
    ) -> Result<Option<SocialPost>, StateError>;

    /// All posts with status Posted, for comment syncing
    async fn list_posted_posts(&self) -> Result<Vec<SocialPost>, StateError>;

    /// Insert a comment unless one with the same (platform, external id)
    /// already exists. Returns true when inserted.
    async fn insert_comment_if_new(&self, comment: &Comment) -> Result<bool, StateError>;

    async fn update_comment(&self, comment: &Comment) -> Result<(), StateError>;

    async fn list_comments(&self, social_post_id: Uuid) -> Result<Vec<Comment>, StateError>;
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for &S {
    async fn dedup_exists(&self, dedup_key: &str) -> Result<bool, StateError> {
        (*self).dedup_exists(dedup_key).await
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), StateError> {
        (*self).insert_item(item).await
    }

    async fn update_item(&self, item: &ContentItem) -> Result<(), StateError> {
        (*self).update_item(item).await
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StateError> {
        (*self).get_item(id).await
    }

    async fn get_item_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<ContentItem>, StateError> {
        (*self).get_item_by_dedup_key(dedup_key).await
    }

    async fn upsert_social_post(&self, post: &SocialPost) -> Result<(), StateError> {
        (*self).upsert_social_post(post).await
    }

    async fn get_social_post(
        &self,
        content_item_id: Uuid,
        platform: Platform,
        language: Language,
    ) -> Result<Option<SocialPost>, StateError> {
        (*self)
            .get_social_post(content_item_id, platform, language)
            .await
    }

    async fn list_posted_posts(&self) -> Result<Vec<SocialPost>, StateError> {
        (*self).list_posted_posts().await
    }

    async fn insert_comment_if_new(&self, comment: &Comment) -> Result<bool, StateError> {
        (*self).insert_comment_if_new(comment).await
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StateError> {
        (*self).update_comment(comment).await
    }

    async fn list_comments(&self, social_post_id: Uuid) -> Result<Vec<Comment>, StateError> {
        (*self).list_comments(social_post_id).await
    }
}

/// Port for loading the pipeline policy. Implementations read fresh state;
/// callers must not cache the result across decision points.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn load(&self) -> Result<PipelinePolicy, StateError>;

    async fn save(&self, policy: &PipelinePolicy) -> Result<(), StateError>;
}

#[async_trait]
impl<P: PolicyStore + ?Sized> PolicyStore for &P {
    async fn load(&self) -> Result<PipelinePolicy, StateError> {
        (*self).load().await
    }

    async fn save(&self, policy: &PipelinePolicy) -> Result<(), StateError> {
        (*self).save(policy).await
    }
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
