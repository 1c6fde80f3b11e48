//! Publication scheduling: auto-publish or hand off to the moderation channel

use crate::model::{ContentItem, Language, PublishStatus};
use crate::policy::PipelinePolicy;
use crate::ports::{Clock, ModerationChannel};

/// What the scheduler decided for one approved item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Published immediately under the current policy
    Published,
    /// Handed to the moderation channel; a human decides
    AwaitingApproval,
    /// Item was already published; nothing to do
    AlreadyPublished,
}

/// Decides, per item and per fresh policy read, whether an approved item goes
/// live immediately or waits in the moderation channel.
pub struct PublicationScheduler<M, K>
where
    M: ModerationChannel,
    K: Clock,
{
    channel: M,
    clock: K,
    site_base_url: String,
}

impl<M, K> PublicationScheduler<M, K>
where
    M: ModerationChannel,
    K: Clock,
{
    pub fn new(channel: M, clock: K, site_base_url: impl Into<String>) -> Self {
        Self {
            channel,
            clock,
            site_base_url: site_base_url.into(),
        }
    }

    /// Route an approved item. Mutates `item` in place; the caller persists.
    pub async fn schedule(
        &self,
        item: &mut ContentItem,
        policy: &PipelinePolicy,
    ) -> ScheduleOutcome {
        if item.is_published() {
            return ScheduleOutcome::AlreadyPublished;
        }

        if policy.auto_publish_enabled {
            self.mark_published(item);
            tracing::info!(item_id = %item.id, "Auto-published");
            return ScheduleOutcome::Published;
        }

        let text = self.approval_request_text(item);
        match self.channel.notify(&text).await {
            Ok(message) => {
                item.moderation_message = Some(message);
            }
            Err(e) => {
                // The item still waits; the channel message is best-effort
                tracing::warn!(item_id = %item.id, error = %e, "Approval notification failed");
            }
        }

        ScheduleOutcome::AwaitingApproval
    }

    /// Explicit human approval or republish. Always (re)publishes, refreshing
    /// the publication timestamp.
    pub fn publish_now(&self, item: &mut ContentItem) {
        self.mark_published(item);
        tracing::info!(item_id = %item.id, "Published on explicit request");
    }

    fn mark_published(&self, item: &mut ContentItem) {
        item.publish_status = PublishStatus::Published;
        item.published_at = Some(self.clock.now());
    }

    /// Public article URL on the site, built from the English slug
    pub fn article_url(&self, item: &ContentItem) -> Option<String> {
        item.variant(Language::En)
            .map(|v| format!("{}/news/{}", self.site_base_url.trim_end_matches('/'), v.slug))
    }

    fn approval_request_text(&self, item: &ContentItem) -> String {
        let title = item
            .variant(Language::En)
            .map(|v| v.title.as_str())
            .unwrap_or(item.original_title.as_str());

        let mut text = format!(
            "Awaiting approval: {}\nSource: {}",
            title, item.source_url
        );
        if let Some(url) = self.article_url(item) {
            text.push_str(&format!("\nPreview: {}", url));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChannelMessageRef, LanguageVariant, RawItem, SourceRef};
    use crate::ports::ChannelError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use time::macros::datetime;

    struct FakeChannel {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeChannel {
        fn new() -> Self {
            Self {
                sent: Mutex::new(vec![]),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ModerationChannel for FakeChannel {
        async fn notify(&self, text: &str) -> Result<ChannelMessageRef, ChannelError> {
            if self.fail {
                return Err(ChannelError::Network("down".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(ChannelMessageRef {
                chat_id: "chat".to_string(),
                message_id: 42,
            })
        }

        async fn edit_message(
            &self,
            _message: &ChannelMessageRef,
            _text: &str,
        ) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn send_fallback(
            &self,
            _reply_to: &ChannelMessageRef,
            _text: &str,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    fn item() -> ContentItem {
        let raw = RawItem {
            url: "https://ex.com/article".to_string(),
            title: "Original".to_string(),
            body: "Body".to_string(),
            image_urls: vec![],
            published_at: datetime!(2025-06-01 12:00 UTC),
            source: SourceRef::Rss {
                feed_url: "https://ex.com/feed.xml".to_string(),
            },
        };
        let mut item = ContentItem::from_raw(&raw, datetime!(2025-06-01 12:00 UTC));
        item.language_variants.insert(
            Language::En,
            LanguageVariant {
                title: "Rewritten title".to_string(),
                body: "Rewritten body".to_string(),
                short_description: "Short".to_string(),
                slug: "rewritten-title".to_string(),
            },
        );
        item
    }

    fn scheduler(channel: FakeChannel) -> PublicationScheduler<FakeChannel, FixedClock> {
        PublicationScheduler::new(
            channel,
            FixedClock(datetime!(2025-06-01 13:00 UTC)),
            "https://site.example/",
        )
    }

    #[tokio::test]
    async fn test_auto_publish_marks_item_published() {
        let scheduler = scheduler(FakeChannel::new());
        let mut item = item();
        let policy = PipelinePolicy {
            auto_publish_enabled: true,
            ..Default::default()
        };

        let outcome = scheduler.schedule(&mut item, &policy).await;
        assert_eq!(outcome, ScheduleOutcome::Published);
        assert!(item.is_published());
        assert_eq!(item.published_at, Some(datetime!(2025-06-01 13:00 UTC)));
    }

    #[tokio::test]
    async fn test_manual_mode_notifies_channel_and_stores_ref() {
        let scheduler = scheduler(FakeChannel::new());
        let mut item = item();

        let outcome = scheduler.schedule(&mut item, &PipelinePolicy::default()).await;
        assert_eq!(outcome, ScheduleOutcome::AwaitingApproval);
        assert!(!item.is_published());
        assert_eq!(
            item.moderation_message,
            Some(ChannelMessageRef {
                chat_id: "chat".to_string(),
                message_id: 42,
            })
        );

        let sent = scheduler.channel.sent.lock().unwrap();
        assert!(sent[0].contains("Rewritten title"));
        assert!(sent[0].contains("https://site.example/news/rewritten-title"));
    }

    #[tokio::test]
    async fn test_channel_failure_still_leaves_item_awaiting() {
        let mut channel = FakeChannel::new();
        channel.fail = true;
        let scheduler = scheduler(channel);
        let mut item = item();

        let outcome = scheduler.schedule(&mut item, &PipelinePolicy::default()).await;
        assert_eq!(outcome, ScheduleOutcome::AwaitingApproval);
        assert!(item.moderation_message.is_none());
    }

    #[tokio::test]
    async fn test_schedule_is_a_noop_for_published_items() {
        let scheduler = scheduler(FakeChannel::new());
        let mut item = item();
        item.publish_status = PublishStatus::Published;
        item.published_at = Some(datetime!(2025-05-01 0:00 UTC));

        let policy = PipelinePolicy {
            auto_publish_enabled: true,
            ..Default::default()
        };
        let outcome = scheduler.schedule(&mut item, &policy).await;
        assert_eq!(outcome, ScheduleOutcome::AlreadyPublished);
        assert_eq!(item.published_at, Some(datetime!(2025-05-01 0:00 UTC)));
    }

    #[test]
    fn test_publish_now_refreshes_timestamp() {
        let scheduler = scheduler(FakeChannel::new());
        let mut item = item();
        item.publish_status = PublishStatus::Published;
        item.published_at = Some(datetime!(2025-05-01 0:00 UTC));

        scheduler.publish_now(&mut item);
        assert_eq!(item.published_at, Some(datetime!(2025-06-01 13:00 UTC)));
    }
}
