use crate::domain::models::{Comment, UserSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Comment row joined with its author summary
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub author_handle: String,
    pub author_avatar_url: Option<String>,
}

impl CommentWithAuthor {
    pub fn author_summary(&self) -> UserSummary {
        UserSummary {
            id: self.author_id,
            display_name: self.author_display_name.clone(),
            handle: self.author_handle.clone(),
            avatar_url: self.author_avatar_url.clone(),
        }
    }
}

/// Repository for Comment operations
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a comment inside the caller's transaction so it commits or
    /// rolls back together with its paired notification.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, content, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut **tx)
        .await
    }

    /// Comments for a batch of posts, creation order ascending, with authors
    pub async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<CommentWithAuthor>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.post_id, c.content, c.created_at,
                   u.id AS author_id,
                   u.display_name AS author_display_name,
                   u.handle AS author_handle,
                   u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}
