use crate::domain::models::{SuggestedUser, User, UserProfile};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for User operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a user by the identity provider's id
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, display_name, handle, avatar_url, created_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Atomic insert-or-fetch keyed on external_id.
    ///
    /// The no-op DO UPDATE makes the statement return the existing row when a
    /// concurrent first-contact call already provisioned this identity, so two
    /// racing callers both observe the winner's row. A unique violation can
    /// still escape on the handle column when a *different* user owns the
    /// derived handle; the caller retries with a disambiguated handle.
    pub async fn upsert_from_identity(
        &self,
        external_id: &str,
        display_name: &str,
        handle: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, display_name, handle, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE
            SET external_id = EXCLUDED.external_id
            RETURNING id, external_id, display_name, handle, avatar_url, created_at
            "#,
        )
        .bind(external_id)
        .bind(display_name)
        .bind(handle)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await
    }

    /// Check a user row exists
    pub async fn exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Profile with follower/following/post counts
    pub async fn get_profile(&self, external_id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.external_id, u.display_name, u.handle, u.avatar_url, u.created_at,
                   (SELECT COUNT(*) FROM follows WHERE followee_id = u.id) AS follower_count,
                   (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count,
                   (SELECT COUNT(*) FROM posts WHERE author_id = u.id) AS post_count
            FROM users u
            WHERE u.external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Random users the viewer does not already follow, excluding the viewer
    pub async fn suggested_users(&self, viewer_id: Uuid, limit: i64) -> Result<Vec<SuggestedUser>> {
        let users = sqlx::query_as::<_, SuggestedUser>(
            r#"
            SELECT u.id, u.display_name, u.handle, u.avatar_url,
                   (SELECT COUNT(*) FROM follows WHERE followee_id = u.id) AS follower_count
            FROM users u
            WHERE u.id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM follows f
                  WHERE f.follower_id = $1 AND f.followee_id = u.id
              )
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(viewer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
