//! Comment sync: pull platform comments, classify them, draft replies
//!
//! Replies are never sent automatically. A drafted reply sits on the comment
//! until a reply request arrives with an explicit confirmation flag.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::model::{Comment, Sentiment};
use crate::ports::{
    AiError, ChatModel, ChatRequest, ContentStore, PublishError, SocialPublisher, StateError,
};

/// A human-confirmed request to post a reply to one comment
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub comment_id: Uuid,
    pub text: String,
    /// Must be set explicitly; replies are never sent on a draft alone
    pub confirmed: bool,
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Reply was not confirmed")]
    NotConfirmed,
    #[error("Comment not found: {0}")]
    UnknownComment(Uuid),
    #[error("No publisher for platform")]
    NoPublisher,
    #[error(transparent)]
    Platform(#[from] PublishError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Pulls comments for every posted item, deduplicates them by platform
/// comment ID, and classifies sentiment. Classification failures degrade to
/// Neutral rather than dropping the comment.
pub struct CommentSyncer<S, C>
where
    S: ContentStore,
    C: ChatModel,
{
    publishers: Vec<Arc<dyn SocialPublisher>>,
    store: S,
    chat: C,
}

impl<S, C> CommentSyncer<S, C>
where
    S: ContentStore,
    C: ChatModel,
{
    pub fn new(publishers: Vec<Arc<dyn SocialPublisher>>, store: S, chat: C) -> Self {
        Self {
            publishers,
            store,
            chat,
        }
    }

    /// One sync pass over all posted posts. Returns the number of newly
    /// stored comments. Per-post fetch failures are logged and skipped.
    pub async fn sync(&self) -> Result<usize, StateError> {
        let posts = self.store.list_posted_posts().await?;
        let mut inserted = 0;

        for post in posts {
            let Some(external_id) = post.external_post_id.as_deref() else {
                continue;
            };
            let Some(publisher) = self.publisher_for(post.platform) else {
                continue;
            };

            let fetched = match publisher.fetch_comments(external_id).await {
                Ok(comments) => comments,
                Err(e) => {
                    tracing::warn!(
                        platform = %post.platform, post_id = %post.id, error = %e,
                        "Comment fetch failed"
                    );
                    continue;
                }
            };

            for platform_comment in fetched {
                let mut comment = Comment {
                    id: Uuid::new_v4(),
                    social_post_id: post.id,
                    platform: post.platform,
                    external_comment_id: platform_comment.external_id,
                    author: platform_comment.author,
                    text: platform_comment.text,
                    sentiment: Sentiment::Neutral,
                    is_read: false,
                    is_replied: false,
                    is_hidden: false,
                    suggested_reply: None,
                    created_at: platform_comment.created_at,
                };

                // Dedup before the AI call; known comments cost nothing
                if !self.store.insert_comment_if_new(&comment).await? {
                    continue;
                }
                inserted += 1;

                comment.sentiment = self.classify_sentiment(&comment.text).await;
                self.store.update_comment(&comment).await?;
            }
        }

        tracing::info!(inserted = inserted, "Comment sync pass done");
        Ok(inserted)
    }

    /// Draft a reply for one comment and persist it on the record. Drafting
    /// is lazy: it runs when asked for, not during sync.
    pub async fn draft_reply(&self, comment: &mut Comment) -> Result<String, AiError> {
        let request = ChatRequest::new(
            "You draft short, friendly replies to social media comments on \
             news posts. Match the commenter's language. Output only the reply.",
            format!(
                "Comment from {} ({}):\n{}\n\nDraft a reply.",
                comment.author,
                comment.sentiment.as_str(),
                comment.text
            ),
        )
        .with_temperature(0.6)
        .with_max_tokens(300);

        let draft = self.chat.complete(request).await?.trim().to_string();
        if draft.is_empty() {
            return Err(AiError::InvalidFormat("Empty reply draft".to_string()));
        }

        comment.suggested_reply = Some(draft.clone());
        if let Err(e) = self.store.update_comment(comment).await {
            tracing::warn!(comment_id = %comment.id, error = %e, "Could not persist draft");
        }

        Ok(draft)
    }

    /// Send a confirmed reply to the platform and mark the comment replied
    pub async fn send_reply(
        &self,
        comment: &mut Comment,
        request: &ReplyRequest,
    ) -> Result<(), ReplyError> {
        if !request.confirmed {
            return Err(ReplyError::NotConfirmed);
        }
        if request.comment_id != comment.id {
            return Err(ReplyError::UnknownComment(request.comment_id));
        }

        let publisher = self
            .publisher_for(comment.platform)
            .ok_or(ReplyError::NoPublisher)?;

        publisher
            .reply_to_comment(&comment.external_comment_id, &request.text)
            .await?;

        comment.is_replied = true;
        comment.is_read = true;
        self.store.update_comment(comment).await?;

        tracing::info!(comment_id = %comment.id, platform = %comment.platform, "Replied");
        Ok(())
    }

    async fn classify_sentiment(&self, text: &str) -> Sentiment {
        let request = ChatRequest::new(
            "You classify social media comments. Respond with exactly one \
             word: positive, negative, neutral, question, or spam.",
            text.to_string(),
        )
        .with_max_tokens(10);

        match self.chat.complete(request).await {
            Ok(response) => response.trim().parse().unwrap_or_else(|_| {
                tracing::debug!(response = %response.trim(), "Unparseable sentiment, using neutral");
                Sentiment::Neutral
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Sentiment classification failed, using neutral");
                Sentiment::Neutral
            }
        }
    }

    fn publisher_for(&self, platform: crate::model::Platform) -> Option<&dyn SocialPublisher> {
        self.publishers
            .iter()
            .find(|p| p.platform() == platform)
            .map(|p| p.as_ref())
    }
}
