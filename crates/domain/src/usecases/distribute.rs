//! Social fan-out: publish one item to every enabled (platform, language) pair

use std::sync::Arc;

use tokio::time::Duration;

use crate::model::{ContentItem, LanguageVariant, Platform, SocialPost, SocialPostStatus};
use crate::policy::PipelinePolicy;
use crate::ports::{
    ChannelError, Clock, ContainerStatus, ContentStore, ModerationChannel, ObjectStore,
    PublishError, SocialPublisher,
};
use crate::util::{PollError, poll_until};

#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Interval between media-container status checks
    pub poll_interval: Duration,
    /// Status checks before giving up on a container
    pub poll_max_attempts: u32,
    /// Public site root, used to build article links in captions
    pub site_base_url: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            poll_max_attempts: 30,
            site_base_url: String::new(),
        }
    }
}

/// Compose a caption that always keeps the article URL and hashtags intact,
/// trimming the description to fit the platform limit.
pub fn build_caption(
    variant: &LanguageVariant,
    article_url: &str,
    tags: &[String],
    max_chars: usize,
) -> String {
    let hashtags = tags
        .iter()
        .map(|t| format!("#{}", t.replace(char::is_whitespace, "")))
        .collect::<Vec<_>>()
        .join(" ");

    let mut tail = format!("\n\n{}", article_url);
    if !hashtags.is_empty() {
        tail.push_str(&format!("\n\n{}", hashtags));
    }

    let head = format!("{}\n\n{}", variant.title, variant.short_description);
    let budget = max_chars.saturating_sub(tail.chars().count());

    let head = if head.chars().count() > budget {
        let cut: String = head.chars().take(budget.saturating_sub(3)).collect();
        format!("{}...", cut.trim_end())
    } else {
        head
    };

    format!("{}{}", head, tail)
}

fn is_ephemeral_media(url: &str) -> bool {
    url.contains("//t.me/") || url.contains("cdn.telegram.org")
}

/// Fans an approved, published item out across platforms and languages.
/// Each pair fails independently; one platform being down never blocks the
/// others.
pub struct Distributor<S, O, M, K>
where
    S: ContentStore,
    O: ObjectStore,
    M: ModerationChannel,
    K: Clock,
{
    publishers: Vec<Arc<dyn SocialPublisher>>,
    store: S,
    objects: O,
    channel: M,
    clock: K,
    config: DistributionConfig,
}

impl<S, O, M, K> Distributor<S, O, M, K>
where
    S: ContentStore,
    O: ObjectStore,
    M: ModerationChannel,
    K: Clock,
{
    pub fn new(
        publishers: Vec<Arc<dyn SocialPublisher>>,
        store: S,
        objects: O,
        channel: M,
        clock: K,
        config: DistributionConfig,
    ) -> Self {
        Self {
            publishers,
            store,
            objects,
            channel,
            clock,
            config,
        }
    }

    /// Run the fan-out for one item under the given policy. Returns the
    /// number of (platform, language) pairs actually attempted.
    pub async fn distribute(&self, item: &ContentItem, policy: &PipelinePolicy) -> usize {
        let media_url = self.resolve_media_url(item).await;
        let mut attempted = 0;

        for (platform, language) in policy.distribution_pairs() {
            let Some(publisher) = self.publisher_for(platform) else {
                tracing::debug!(platform = %platform, "No publisher configured, skipping");
                continue;
            };
            if !publisher.is_enabled() {
                continue;
            }

            // A Pending row means another worker is mid-flight; re-attempting
            // it could double-post on the platform
            match self.store.get_social_post(item.id, platform, language).await {
                Ok(Some(existing))
                    if matches!(
                        existing.status,
                        SocialPostStatus::Posted | SocialPostStatus::Pending
                    ) =>
                {
                    tracing::debug!(
                        platform = %platform, language = %language,
                        status = ?existing.status,
                        "Already posted or in flight, skipping"
                    );
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Post lookup failed, attempting anyway");
                }
            }

            let Some(variant) = item.variant(language) else {
                tracing::warn!(item_id = %item.id, language = %language, "No variant, skipping");
                continue;
            };

            attempted += 1;
            let mut post = SocialPost::pending(item.id, platform, language, self.clock.now());
            if let Err(e) = self.store.upsert_social_post(&post).await {
                tracing::warn!(error = %e, "Could not record pending post");
            }

            let caption = build_caption(
                variant,
                &self.article_url(item, variant),
                &item.tags,
                platform.max_caption_chars(),
            );

            match self
                .publish_one(publisher, media_url.as_deref(), &caption)
                .await
            {
                Ok(handle) => {
                    post.status = SocialPostStatus::Posted;
                    post.external_post_id = Some(handle.external_id);
                    post.post_url = handle.url;
                    tracing::info!(
                        item_id = %item.id, platform = %platform, language = %language,
                        "Posted"
                    );
                }
                Err(e) => {
                    post.status = SocialPostStatus::Failed;
                    post.error_message = Some(e.to_string());
                    tracing::warn!(
                        item_id = %item.id, platform = %platform, language = %language,
                        error = %e, "Post failed"
                    );
                }
            }

            if let Err(e) = self.store.upsert_social_post(&post).await {
                tracing::error!(error = %e, "Could not record post outcome");
            }
        }

        if attempted > 0 {
            self.report_status(item).await;
        }

        attempted
    }

    /// Full container lifecycle against one platform
    async fn publish_one(
        &self,
        publisher: &dyn SocialPublisher,
        media_url: Option<&str>,
        caption: &str,
    ) -> Result<crate::ports::PostHandle, PublishError> {
        let container_id = publisher.create_container(media_url, caption).await?;

        let ready = poll_until(
            || async {
                match publisher.container_status(&container_id).await? {
                    ContainerStatus::Ready => Ok(Some(())),
                    ContainerStatus::Pending => Ok(None),
                    ContainerStatus::Error(e) => Err(PublishError::ProcessingFailed(e)),
                }
            },
            self.config.poll_interval,
            self.config.poll_max_attempts,
        )
        .await;

        match ready {
            Ok(()) => {}
            Err(PollError::Timeout { .. }) => return Err(PublishError::ProcessingTimeout),
            Err(PollError::Failed(e)) => return Err(PublishError::ProcessingFailed(e)),
        }

        publisher.publish_container(&container_id).await
    }

    fn publisher_for(&self, platform: Platform) -> Option<&dyn SocialPublisher> {
        self.publishers
            .iter()
            .find(|p| p.platform() == platform)
            .map(|p| p.as_ref())
    }

    fn article_url(&self, item: &ContentItem, variant: &LanguageVariant) -> String {
        if self.config.site_base_url.is_empty() {
            item.source_url.clone()
        } else {
            format!(
                "{}/news/{}",
                self.config.site_base_url.trim_end_matches('/'),
                variant.slug
            )
        }
    }

    /// Pick the item's media: a generated image first, then source media.
    /// Messaging-app URLs expire, so those are mirrored to object storage.
    async fn resolve_media_url(&self, item: &ContentItem) -> Option<String> {
        let candidate = item
            .image
            .as_ref()
            .and_then(|img| img.url.clone())
            .or_else(|| item.media_urls.first().cloned())?;

        if !is_ephemeral_media(&candidate) {
            return Some(candidate);
        }

        let name = candidate.rsplit('/').next().unwrap_or("media");
        let path = format!("media/{}/{}", item.id, name);
        match self.objects.mirror(&candidate, &path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "Media mirror failed");
                None
            }
        }
    }

    /// Update the item's moderation-channel message with per-pair results.
    /// Edits can be rejected for old messages; fall back to a threaded reply.
    async fn report_status(&self, item: &ContentItem) {
        let Some(message) = &item.moderation_message else {
            return;
        };

        let posts = match self.store.list_posted_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load posts for status report");
                return;
            }
        };

        let mut lines = vec![format!("Distribution update: {}", item.original_title)];
        for post in posts.iter().filter(|p| p.content_item_id == item.id) {
            lines.push(format!(
                "- {} [{}]: {}",
                post.platform,
                post.language,
                post.post_url.as_deref().unwrap_or("posted")
            ));
        }
        let text = lines.join("\n");

        match self.channel.edit_message(message, &text).await {
            Ok(()) => {}
            Err(ChannelError::EditRejected(_)) => {
                if let Err(e) = self.channel.send_fallback(message, &text).await {
                    tracing::warn!(error = %e, "Status fallback message failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Status edit failed");
            }
        }
    }
}
