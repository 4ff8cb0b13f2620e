use crate::domain::models::{Notification, NotificationKind, NotificationView, UserSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    actor_id: Uuid,
    actor_display_name: String,
    actor_handle: String,
    actor_avatar_url: Option<String>,
    post_id: Option<Uuid>,
    post_content: Option<String>,
    comment_content: Option<String>,
}

/// Repository for Notification records.
///
/// Notifications are append-only history: creation happens inside the
/// engagement transaction that produced the event, and the only mutation
/// afterwards is flipping the read flag. Removing an edge later (unlike,
/// unfollow) does not retract its notification.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification inside the caller's transaction. Callers only
    /// invoke this on cross-user events (actor != recipient).
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        post_id: Option<Uuid>,
        comment_id: Option<Uuid>,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (recipient_id, actor_id, kind, post_id, comment_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, recipient_id, actor_id, kind, post_id, comment_id, is_read, created_at
            "#,
        )
        .bind(recipient_id)
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(post_id)
        .bind(comment_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Recency-ordered notifications for a recipient, with actor and related
    /// content summaries attached
    pub async fn list_for_recipient(&self, recipient_id: Uuid) -> Result<Vec<NotificationView>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.id, n.kind, n.is_read, n.created_at,
                   u.id AS actor_id,
                   u.display_name AS actor_display_name,
                   u.handle AS actor_handle,
                   u.avatar_url AS actor_avatar_url,
                   n.post_id,
                   p.content AS post_content,
                   c.content AS comment_content
            FROM notifications n
            JOIN users u ON u.id = n.actor_id
            LEFT JOIN posts p ON p.id = n.post_id
            LEFT JOIN comments c ON c.id = n.comment_id
            WHERE n.recipient_id = $1
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        let views = rows
            .into_iter()
            .filter_map(|row| {
                // rows with an unknown kind are skipped rather than failing
                // the whole listing
                let kind = NotificationKind::parse(&row.kind)?;
                Some(NotificationView {
                    id: row.id,
                    kind,
                    is_read: row.is_read,
                    created_at: row.created_at,
                    actor: UserSummary {
                        id: row.actor_id,
                        display_name: row.actor_display_name,
                        handle: row.actor_handle,
                        avatar_url: row.actor_avatar_url,
                    },
                    post_id: row.post_id,
                    post_content: row.post_content,
                    comment_content: row.comment_content,
                })
            })
            .collect();

        Ok(views)
    }

    /// Flip the read flag on the recipient's own notifications; returns the
    /// number of rows updated
    pub async fn mark_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let affected = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE recipient_id = $1 AND id = ANY($2) AND is_read = FALSE
            "#,
        )
        .bind(recipient_id)
        .bind(ids)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    /// Unread notification count for a recipient
    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE recipient_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
