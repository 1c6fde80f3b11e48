//! SQLite state store implementation

use async_trait::async_trait;
use newsflow_domain::{
    Comment, ContentItem, ContentStore, Language, PipelinePolicy, Platform, PolicyStore,
    Sentiment, SocialPost, SocialPostStatus, StateError,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// SQLite-backed content and policy store.
///
/// Content items are stored as a JSON document next to the indexed dedup
/// key; social posts and comments get flat columns because the store
/// queries them by field.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_items (
                id TEXT PRIMARY KEY,
                dedup_key TEXT NOT NULL UNIQUE,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS social_posts (
                id TEXT PRIMARY KEY,
                content_item_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                language TEXT NOT NULL,
                status TEXT NOT NULL,
                external_post_id TEXT,
                post_url TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        // At most one live (non-failed) post per item/platform/language
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_social_posts_live
            ON social_posts(content_item_id, platform, language)
            WHERE status != 'failed'
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                social_post_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                external_comment_id TEXT NOT NULL,
                author TEXT NOT NULL,
                text TEXT NOT NULL,
                sentiment TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_replied INTEGER NOT NULL DEFAULT 0,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                suggested_reply TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(platform, external_comment_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_policy (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }
}

fn status_str(status: SocialPostStatus) -> &'static str {
    match status {
        SocialPostStatus::Pending => "pending",
        SocialPostStatus::Posted => "posted",
        SocialPostStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> Result<SocialPostStatus, StateError> {
    match s {
        "pending" => Ok(SocialPostStatus::Pending),
        "posted" => Ok(SocialPostStatus::Posted),
        "failed" => Ok(SocialPostStatus::Failed),
        other => Err(StateError::Serialization(format!(
            "Unknown post status: {}",
            other
        ))),
    }
}

fn format_time(at: OffsetDateTime) -> Result<String, StateError> {
    at.format(&Rfc3339)
        .map_err(|e| StateError::Serialization(e.to_string()))
}

fn parse_time(s: &str) -> Result<OffsetDateTime, StateError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| StateError::Serialization(e.to_string()))
}

fn parse_uuid(s: &str) -> Result<Uuid, StateError> {
    Uuid::parse_str(s).map_err(|e| StateError::Serialization(e.to_string()))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

type SocialPostRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn post_from_row(row: SocialPostRow) -> Result<SocialPost, StateError> {
    let (
        id,
        content_item_id,
        platform,
        language,
        status,
        external_post_id,
        post_url,
        error_message,
        created_at,
    ) = row;

    Ok(SocialPost {
        id: parse_uuid(&id)?,
        content_item_id: parse_uuid(&content_item_id)?,
        platform: platform
            .parse::<Platform>()
            .map_err(StateError::Serialization)?,
        language: language
            .parse::<Language>()
            .map_err(StateError::Serialization)?,
        status: parse_status(&status)?,
        external_post_id,
        post_url,
        error_message,
        created_at: parse_time(&created_at)?,
    })
}

type CommentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    i64,
    i64,
    Option<String>,
    String,
);

fn comment_from_row(row: CommentRow) -> Result<Comment, StateError> {
    let (
        id,
        social_post_id,
        platform,
        external_comment_id,
        author,
        text,
        sentiment,
        is_read,
        is_replied,
        is_hidden,
        suggested_reply,
        created_at,
    ) = row;

    Ok(Comment {
        id: parse_uuid(&id)?,
        social_post_id: parse_uuid(&social_post_id)?,
        platform: platform
            .parse::<Platform>()
            .map_err(StateError::Serialization)?,
        external_comment_id,
        author,
        text,
        sentiment: sentiment
            .parse::<Sentiment>()
            .map_err(StateError::Serialization)?,
        is_read: is_read != 0,
        is_replied: is_replied != 0,
        is_hidden: is_hidden != 0,
        suggested_reply,
        created_at: parse_time(&created_at)?,
    })
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn dedup_exists(&self, dedup_key: &str) -> Result<bool, StateError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM content_items WHERE dedup_key = ?")
                .bind(dedup_key)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(count.0 > 0)
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), StateError> {
        let data =
            serde_json::to_string(item).map_err(|e| StateError::Serialization(e.to_string()))?;
        let created_at = format_time(item.created_at)?;

        let result = sqlx::query(
            "INSERT INTO content_items (id, dedup_key, data, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(&item.dedup_key)
        .bind(&data)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StateError::Duplicate(item.dedup_key.clone())),
            Err(e) => Err(StateError::Database(e.to_string())),
        }
    }

    async fn update_item(&self, item: &ContentItem) -> Result<(), StateError> {
        let data =
            serde_json::to_string(item).map_err(|e| StateError::Serialization(e.to_string()))?;

        let result = sqlx::query("UPDATE content_items SET data = ? WHERE id = ?")
            .bind(&data)
            .bind(item.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StateError::NotFound(format!("content item {}", item.id)));
        }
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<ContentItem>, StateError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM content_items WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        match row {
            Some((data,)) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StateError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn get_item_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<ContentItem>, StateError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM content_items WHERE dedup_key = ?")
                .bind(dedup_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StateError::Database(e.to_string()))?;

        match row {
            Some((data,)) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StateError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn upsert_social_post(&self, post: &SocialPost) -> Result<(), StateError> {
        let created_at = format_time(post.created_at)?;

        // Same id means an in-place status update
        let updated = sqlx::query(
            r#"
            UPDATE social_posts SET
                status = ?, external_post_id = ?, post_url = ?, error_message = ?
            WHERE id = ?
            "#,
        )
        .bind(status_str(post.status))
        .bind(&post.external_post_id)
        .bind(&post.post_url)
        .bind(&post.error_message)
        .bind(post.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        if updated.rows_affected() > 0 {
            return Ok(());
        }

        // A posted row is final; a pending one is superseded by the new post
        let existing: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, status FROM social_posts
            WHERE content_item_id = ? AND platform = ? AND language = ? AND status != 'failed'
            "#,
        )
        .bind(post.content_item_id.to_string())
        .bind(post.platform.as_str())
        .bind(post.language.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        if let Some((existing_id, status)) = existing {
            if status == "posted" {
                return Ok(());
            }
            sqlx::query("DELETE FROM social_posts WHERE id = ?")
                .bind(&existing_id)
                .execute(&self.pool)
                .await
                .map_err(|e| StateError::Database(e.to_string()))?;
        }

        sqlx::query(
            r#"
            INSERT INTO social_posts
            (id, content_item_id, platform, language, status,
             external_post_id, post_url, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.id.to_string())
        .bind(post.content_item_id.to_string())
        .bind(post.platform.as_str())
        .bind(post.language.code())
        .bind(status_str(post.status))
        .bind(&post.external_post_id)
        .bind(&post.post_url)
        .bind(&post.error_message)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_social_post(
        &self,
        content_item_id: Uuid,
        platform: Platform,
        language: Language,
    ) -> Result<Option<SocialPost>, StateError> {
        // Prefer the live row; fall back to the latest failed attempt
        let row: Option<SocialPostRow> = sqlx::query_as(
            r#"
            SELECT id, content_item_id, platform, language, status,
                   external_post_id, post_url, error_message, created_at
            FROM social_posts
            WHERE content_item_id = ? AND platform = ? AND language = ?
            ORDER BY (status != 'failed') DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(content_item_id.to_string())
        .bind(platform.as_str())
        .bind(language.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        row.map(post_from_row).transpose()
    }

    async fn list_posted_posts(&self) -> Result<Vec<SocialPost>, StateError> {
        let rows: Vec<SocialPostRow> = sqlx::query_as(
            r#"
            SELECT id, content_item_id, platform, language, status,
                   external_post_id, post_url, error_message, created_at
            FROM social_posts
            WHERE status = 'posted'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        rows.into_iter().map(post_from_row).collect()
    }

    async fn insert_comment_if_new(&self, comment: &Comment) -> Result<bool, StateError> {
        let created_at = format_time(comment.created_at)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO comments
            (id, social_post_id, platform, external_comment_id, author, text,
             sentiment, is_read, is_replied, is_hidden, suggested_reply, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.to_string())
        .bind(comment.social_post_id.to_string())
        .bind(comment.platform.as_str())
        .bind(&comment.external_comment_id)
        .bind(&comment.author)
        .bind(&comment.text)
        .bind(comment.sentiment.as_str())
        .bind(comment.is_read as i64)
        .bind(comment.is_replied as i64)
        .bind(comment.is_hidden as i64)
        .bind(&comment.suggested_reply)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StateError> {
        let result = sqlx::query(
            r#"
            UPDATE comments SET
                sentiment = ?, is_read = ?, is_replied = ?, is_hidden = ?, suggested_reply = ?
            WHERE id = ?
            "#,
        )
        .bind(comment.sentiment.as_str())
        .bind(comment.is_read as i64)
        .bind(comment.is_replied as i64)
        .bind(comment.is_hidden as i64)
        .bind(&comment.suggested_reply)
        .bind(comment.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StateError::NotFound(format!("comment {}", comment.id)));
        }
        Ok(())
    }

    async fn list_comments(&self, social_post_id: Uuid) -> Result<Vec<Comment>, StateError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, social_post_id, platform, external_comment_id, author, text,
                   sentiment, is_read, is_replied, is_hidden, suggested_reply, created_at
            FROM comments
            WHERE social_post_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(social_post_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        rows.into_iter().map(comment_from_row).collect()
    }
}

#[async_trait]
impl PolicyStore for SqliteStore {
    async fn load(&self) -> Result<PipelinePolicy, StateError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM pipeline_policy WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StateError::Database(e.to_string()))?;

        match row {
            Some((data,)) => serde_json::from_str(&data)
                .map_err(|e| StateError::Serialization(e.to_string())),
            None => Ok(PipelinePolicy::default()),
        }
    }

    async fn save(&self, policy: &PipelinePolicy) -> Result<(), StateError> {
        let data =
            serde_json::to_string(policy).map_err(|e| StateError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO pipeline_policy (id, data) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsflow_domain::{RawItem, SourceRef};

    fn raw_item(url: &str) -> RawItem {
        RawItem {
            url: url.to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            image_urls: vec![],
            published_at: OffsetDateTime::now_utc(),
            source: SourceRef::Rss {
                feed_url: "https://news.example/feed".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_item_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let item = ContentItem::from_raw(&raw_item("https://news.example/a"), OffsetDateTime::now_utc());

        store.insert_item(&item).await.unwrap();

        assert!(store.dedup_exists(&item.dedup_key).await.unwrap());
        let loaded = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(loaded.original_title, "Title");

        let by_key = store
            .get_item_by_dedup_key(&item.dedup_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, item.id);
    }

    #[tokio::test]
    async fn test_duplicate_dedup_key_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();
        let first = ContentItem::from_raw(&raw_item("https://news.example/a"), now);
        let second = ContentItem::from_raw(&raw_item("https://news.example/a"), now);

        store.insert_item(&first).await.unwrap();
        let result = store.insert_item(&second).await;

        assert!(matches!(result, Err(StateError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        let item = ContentItem::from_raw(&raw_item("https://news.example/a"), OffsetDateTime::now_utc());

        let result = store.update_item(&item).await;
        assert!(matches!(result, Err(StateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_posted_row_is_never_overwritten() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();
        let item_id = Uuid::new_v4();

        let mut posted = SocialPost::pending(item_id, Platform::Instagram, Language::En, now);
        posted.status = SocialPostStatus::Posted;
        posted.external_post_id = Some("m-1".to_string());
        store.upsert_social_post(&posted).await.unwrap();

        // A later pending attempt must not replace the posted row
        let retry = SocialPost::pending(item_id, Platform::Instagram, Language::En, now);
        store.upsert_social_post(&retry).await.unwrap();

        let current = store
            .get_social_post(item_id, Platform::Instagram, Language::En)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, posted.id);
        assert_eq!(current.status, SocialPostStatus::Posted);
    }

    #[tokio::test]
    async fn test_pending_row_is_superseded() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();
        let item_id = Uuid::new_v4();

        let stale = SocialPost::pending(item_id, Platform::LinkedIn, Language::No, now);
        store.upsert_social_post(&stale).await.unwrap();

        let fresh = SocialPost::pending(item_id, Platform::LinkedIn, Language::No, now);
        store.upsert_social_post(&fresh).await.unwrap();

        let current = store
            .get_social_post(item_id, Platform::LinkedIn, Language::No)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, fresh.id);
    }

    #[tokio::test]
    async fn test_same_id_upsert_updates_status() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();
        let item_id = Uuid::new_v4();

        let mut post = SocialPost::pending(item_id, Platform::Facebook, Language::En, now);
        store.upsert_social_post(&post).await.unwrap();

        post.status = SocialPostStatus::Posted;
        post.external_post_id = Some("555_777".to_string());
        post.post_url = Some("https://www.facebook.com/555_777".to_string());
        store.upsert_social_post(&post).await.unwrap();

        let posted = store.list_posted_posts().await.unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].external_post_id.as_deref(), Some("555_777"));
    }

    #[tokio::test]
    async fn test_comment_dedup_on_external_id() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();

        let comment = Comment {
            id: Uuid::new_v4(),
            social_post_id: Uuid::new_v4(),
            platform: Platform::Instagram,
            external_comment_id: "c-1".to_string(),
            author: "reader".to_string(),
            text: "Nice".to_string(),
            sentiment: Sentiment::Positive,
            is_read: false,
            is_replied: false,
            is_hidden: false,
            suggested_reply: None,
            created_at: now,
        };

        assert!(store.insert_comment_if_new(&comment).await.unwrap());

        let again = Comment {
            id: Uuid::new_v4(),
            ..comment.clone()
        };
        assert!(!store.insert_comment_if_new(&again).await.unwrap());

        let comments = store.list_comments(comment.social_post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[tokio::test]
    async fn test_update_comment_persists_flags() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = OffsetDateTime::now_utc();

        let mut comment = Comment {
            id: Uuid::new_v4(),
            social_post_id: Uuid::new_v4(),
            platform: Platform::Facebook,
            external_comment_id: "c-2".to_string(),
            author: "reader".to_string(),
            text: "Question?".to_string(),
            sentiment: Sentiment::Question,
            is_read: false,
            is_replied: false,
            is_hidden: false,
            suggested_reply: None,
            created_at: now,
        };
        store.insert_comment_if_new(&comment).await.unwrap();

        comment.is_replied = true;
        comment.suggested_reply = Some("Answer".to_string());
        store.update_comment(&comment).await.unwrap();

        let comments = store.list_comments(comment.social_post_id).await.unwrap();
        assert!(comments[0].is_replied);
        assert_eq!(comments[0].suggested_reply.as_deref(), Some("Answer"));
    }

    #[tokio::test]
    async fn test_policy_defaults_then_roundtrips() {
        let store = SqliteStore::in_memory().await.unwrap();

        let initial = store.load().await.unwrap();
        assert!(initial.pre_moderation_enabled);
        assert!(!initial.auto_publish_enabled);

        let mut policy = initial;
        policy.auto_publish_enabled = true;
        store.save(&policy).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.auto_publish_enabled);
    }
}
