//! In-memory state store for dry runs

use async_trait::async_trait;
use newsflow_domain::{
    Comment, ContentItem, ContentStore, Language, PipelinePolicy, Platform, PolicyStore,
    SocialPost, SocialPostStatus, StateError,
};
use std::sync::Mutex;
use uuid::Uuid;

/// Content and policy store that keeps everything in memory. Dry runs use
/// it so the database stays untouched; state is gone when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    items: Mutex<Vec<ContentItem>>,
    posts: Mutex<Vec<SocialPost>>,
    comments: Mutex<Vec<Comment>>,
    policy: Mutex<Option<PipelinePolicy>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err() -> StateError {
    StateError::Database("Lock poisoned".to_string())
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn dedup_exists(&self, dedup_key: &str) -> Result<bool, StateError> {
        let items = self.items.lock().map_err(|_| lock_err())?;
        Ok(items.iter().any(|i| i.dedup_key == dedup_key))
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), StateError> {
        let mut items = self.items.lock().map_err(|_| lock_err())?;
        if items.iter().any(|i| i.dedup_key == item.dedup_key) {
            return Err(StateError::Duplicate(item.dedup_key.clone()));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &ContentItem) -> Result<(), StateError> {
        let mut items = self.items.lock().map_err(|_| lock_err())?;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(StateError::NotFound(format!("content item {}", item.id))),
        }
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StateError> {
        let items = self.items.lock().map_err(|_| lock_err())?;
        Ok(items.iter().find(|i| i.id == id).cloned())
    }

    async fn get_item_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<ContentItem>, StateError> {
        let items = self.items.lock().map_err(|_| lock_err())?;
        Ok(items.iter().find(|i| i.dedup_key == dedup_key).cloned())
    }

    async fn upsert_social_post(&self, post: &SocialPost) -> Result<(), StateError> {
        let mut posts = self.posts.lock().map_err(|_| lock_err())?;

        if let Some(existing) = posts.iter_mut().find(|p| p.id == post.id) {
            *existing = post.clone();
            return Ok(());
        }

        let live = posts.iter().position(|p| {
            p.content_item_id == post.content_item_id
                && p.platform == post.platform
                && p.language == post.language
                && p.status != SocialPostStatus::Failed
        });

        if let Some(index) = live {
            if posts[index].status == SocialPostStatus::Posted {
                return Ok(());
            }
            posts.remove(index);
        }

        posts.push(post.clone());
        Ok(())
    }

    async fn get_social_post(
        &self,
        content_item_id: Uuid,
        platform: Platform,
        language: Language,
    ) -> Result<Option<SocialPost>, StateError> {
        let posts = self.posts.lock().map_err(|_| lock_err())?;
        let matching: Vec<&SocialPost> = posts
            .iter()
            .filter(|p| {
                p.content_item_id == content_item_id
                    && p.platform == platform
                    && p.language == language
            })
            .collect();

        let live = matching
            .iter()
            .find(|p| p.status != SocialPostStatus::Failed);
        Ok(live.or(matching.last()).map(|p| (*p).clone()))
    }

    async fn list_posted_posts(&self) -> Result<Vec<SocialPost>, StateError> {
        let posts = self.posts.lock().map_err(|_| lock_err())?;
        Ok(posts
            .iter()
            .filter(|p| p.status == SocialPostStatus::Posted)
            .cloned()
            .collect())
    }

    async fn insert_comment_if_new(&self, comment: &Comment) -> Result<bool, StateError> {
        let mut comments = self.comments.lock().map_err(|_| lock_err())?;
        let exists = comments.iter().any(|c| {
            c.platform == comment.platform && c.external_comment_id == comment.external_comment_id
        });
        if exists {
            return Ok(false);
        }
        comments.push(comment.clone());
        Ok(true)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StateError> {
        let mut comments = self.comments.lock().map_err(|_| lock_err())?;
        match comments.iter_mut().find(|c| c.id == comment.id) {
            Some(existing) => {
                *existing = comment.clone();
                Ok(())
            }
            None => Err(StateError::NotFound(format!("comment {}", comment.id))),
        }
    }

    async fn list_comments(&self, social_post_id: Uuid) -> Result<Vec<Comment>, StateError> {
        let comments = self.comments.lock().map_err(|_| lock_err())?;
        Ok(comments
            .iter()
            .filter(|c| c.social_post_id == social_post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn load(&self) -> Result<PipelinePolicy, StateError> {
        let policy = self.policy.lock().map_err(|_| lock_err())?;
        Ok(policy.clone().unwrap_or_default())
    }

    async fn save(&self, policy: &PipelinePolicy) -> Result<(), StateError> {
        let mut stored = self.policy.lock().map_err(|_| lock_err())?;
        *stored = Some(policy.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsflow_domain::{RawItem, SourceRef};
    use time::OffsetDateTime;

    fn item(url: &str) -> ContentItem {
        let raw = RawItem {
            url: url.to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            image_urls: vec![],
            published_at: OffsetDateTime::now_utc(),
            source: SourceRef::Rss {
                feed_url: "https://news.example/feed".to_string(),
            },
        };
        ContentItem::from_raw(&raw, OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = InMemoryStore::new();
        let first = item("https://news.example/a");
        let second = item("https://news.example/a");

        store.insert_item(&first).await.unwrap();
        let result = store.insert_item(&second).await;

        assert!(matches!(result, Err(StateError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_posted_row_survives_new_pending() {
        let store = InMemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let item_id = Uuid::new_v4();

        let mut posted = SocialPost::pending(item_id, Platform::Instagram, Language::En, now);
        posted.status = SocialPostStatus::Posted;
        store.upsert_social_post(&posted).await.unwrap();

        let retry = SocialPost::pending(item_id, Platform::Instagram, Language::En, now);
        store.upsert_social_post(&retry).await.unwrap();

        let current = store
            .get_social_post(item_id, Platform::Instagram, Language::En)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, posted.id);
    }

    #[tokio::test]
    async fn test_policy_defaults_when_unset() {
        let store = InMemoryStore::new();
        let policy = store.load().await.unwrap();
        assert!(policy.pre_moderation_enabled);
    }
}
