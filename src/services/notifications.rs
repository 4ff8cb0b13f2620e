//! Notification listing and read-state tracking.
//!
//! Creation is not exposed here: notification rows are only ever written
//! inside the engagement/comment transactions that produced the event.

use crate::domain::models::NotificationView;
use crate::error::ServiceResult;
use crate::repository::NotificationRepository;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
        }
    }

    /// Recency-ordered notifications for the recipient
    pub async fn list(&self, recipient_id: Uuid) -> ServiceResult<Vec<NotificationView>> {
        Ok(self.notifications.list_for_recipient(recipient_id).await?)
    }

    /// Mark the recipient's notifications read; ids belonging to other
    /// recipients are ignored. Returns the number of rows flipped.
    pub async fn mark_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> ServiceResult<u64> {
        Ok(self.notifications.mark_read(recipient_id, ids).await?)
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> ServiceResult<i64> {
        Ok(self.notifications.unread_count(recipient_id).await?)
    }
}
