use crate::domain::models::{Post, UserSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Post row joined with its author summary, as selected for the feed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub author_handle: String,
    pub author_avatar_url: Option<String>,
}

impl PostWithAuthor {
    pub fn author_summary(&self) -> UserSummary {
        UserSummary {
            id: self.author_id,
            display_name: self.author_display_name.clone(),
            handle: self.author_handle.clone(),
            avatar_url: self.author_avatar_url.clone(),
        }
    }
}

/// Repository for Post operations
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub async fn create_post(
        &self,
        author_id: Uuid,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, content, image_url)
            VALUES ($1, $2, $3)
            RETURNING id, author_id, content, image_url, created_at
            "#,
        )
        .bind(author_id)
        .bind(content)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Resolve a post's author; None when the post does not exist
    pub async fn get_author(&self, post_id: Uuid) -> Result<Option<Uuid>> {
        let author: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT author_id FROM posts WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    /// Delete a post. Comments, likes and related notifications go with it
    /// through the cascading foreign keys. Returns false when no row matched.
    pub async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM posts WHERE id = $1
            "#,
        )
        .bind(post_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    /// Full feed listing, newest first, with author summaries
    pub async fn list_with_authors(&self) -> Result<Vec<PostWithAuthor>> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.content, p.image_url, p.created_at,
                   u.id AS author_id,
                   u.display_name AS author_display_name,
                   u.handle AS author_handle,
                   u.avatar_url AS author_avatar_url
            FROM posts p
            JOIN users u ON u.id = p.author_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
