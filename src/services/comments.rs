//! Comment creation, atomically paired with its notification.

use crate::domain::models::{Comment, NotificationKind};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::{CommentRepository, NotificationRepository, PostRepository};
use crate::services::feed_signal::FeedSignal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
    comments: CommentRepository,
    notifications: NotificationRepository,
    posts: PostRepository,
    signal: FeedSignal,
}

impl CommentService {
    pub fn new(pool: PgPool, signal: FeedSignal) -> Self {
        Self {
            comments: CommentRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            posts: PostRepository::new(pool.clone()),
            pool,
            signal,
        }
    }

    /// Create a comment on a post. The comment and its COMMENT notification
    /// (cross-user only) commit together or not at all: the notification
    /// references the new comment's id, so neither may exist without the
    /// other having been attempted in the same transaction.
    pub async fn create_comment(
        &self,
        actor: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> ServiceResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Content is required".into()));
        }

        let post_author = self
            .posts
            .get_author(post_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Post not found".into()))?;

        let mut tx = self.pool.begin().await?;

        let comment = self.comments.insert(&mut tx, post_id, actor, content).await?;

        if post_author != actor {
            self.notifications
                .insert(
                    &mut tx,
                    post_author,
                    actor,
                    NotificationKind::Comment,
                    Some(post_id),
                    Some(comment.id),
                )
                .await?;
        }

        tx.commit().await?;
        debug!(comment_id = %comment.id, post_id = %post_id, "comment created");

        self.signal.feed_changed().await;
        if post_author != actor {
            self.signal.notifications_changed(post_author).await;
        }

        Ok(comment)
    }
}
