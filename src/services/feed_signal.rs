//! Feed-changed signal over Redis Pub/Sub.
//!
//! Every successful mutation publishes a fire-and-forget invalidation message
//! for the rendering/caching layer. Publishing is best-effort: a failure is
//! logged and never fails the mutation that triggered it.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Entity whose cached representation went stale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Feed,
    User,
    Notification,
}

/// Invalidation message broadcast to cache subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationMessage {
    pub message_id: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source_service: String,
}

impl InvalidationMessage {
    fn new(entity_type: EntityType, entity_id: Option<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            entity_type,
            entity_id,
            timestamp: chrono::Utc::now(),
            source_service: FeedSignal::SERVICE_NAME.to_string(),
        }
    }
}

/// Publisher handle, cheap to clone. Constructed disabled when no Redis URL
/// is configured (tests, local runs without a cache layer).
#[derive(Clone)]
pub struct FeedSignal {
    conn: Option<ConnectionManager>,
}

impl FeedSignal {
    /// Redis channel the rendering layer subscribes to
    pub const CHANNEL: &'static str = "cache:invalidate";

    const SERVICE_NAME: &'static str = "ripple";

    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn: Some(conn) })
    }

    /// A signal that drops every message
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Broadcast that the feed projection changed
    pub async fn feed_changed(&self) {
        self.publish(InvalidationMessage::new(EntityType::Feed, None))
            .await;
    }

    /// Broadcast that a user's notification list changed
    pub async fn notifications_changed(&self, recipient_id: Uuid) {
        self.publish(InvalidationMessage::new(
            EntityType::Notification,
            Some(recipient_id.to_string()),
        ))
        .await;
    }

    async fn publish(&self, message: InvalidationMessage) {
        let Some(conn) = &self.conn else {
            return;
        };

        let payload = match serde_json::to_string(&message) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize invalidation message: {}", e);
                return;
            }
        };

        let mut conn = conn.clone();
        match conn.publish::<_, _, i64>(Self::CHANNEL, payload).await {
            Ok(receivers) => {
                debug!(
                    entity_type = ?message.entity_type,
                    receivers, "published invalidation"
                );
            }
            Err(e) => {
                warn!("Failed to publish invalidation: {}", e);
            }
        }
    }
}
