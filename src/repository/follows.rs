use crate::domain::models::Follow;
use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for Follow operations
#[derive(Clone)]
pub struct FollowRepository {
    pool: PgPool,
}

impl FollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if follower already follows followee
    pub async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE follower_id = $1 AND followee_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a follow edge inside the caller's transaction. Unique violations
    /// on the (follower, followee) pair surface to the caller.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<Follow, sqlx::Error> {
        sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (follower_id, followee_id)
            VALUES ($1, $2)
            RETURNING id, follower_id, followee_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Delete a follow edge (idempotent); returns true if a row was removed
    pub async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND followee_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }
}
