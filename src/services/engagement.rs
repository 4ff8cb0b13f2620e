//! Toggle-like and toggle-follow.
//!
//! Both operations share one toggle routine over an edge descriptor: probe
//! the edge, delete it when present, otherwise insert it together with its
//! conditional notification in a single transaction. The composite unique
//! indexes are the source of truth under concurrent duplicate creates; a
//! unique violation at insert means the other caller won and is reconciled
//! into the create branch's result instead of an error.
//!
//! Removing an edge never retracts the notification it once produced;
//! notifications are append-only history.

use crate::domain::models::NotificationKind;
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::repository::{
    FollowRepository, LikeRepository, NotificationRepository, PostRepository, UserRepository,
};
use crate::services::feed_signal::FeedSignal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Engagement edge being toggled, with everything the create branch needs to
/// decide its notification: kind, recipient and related post.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Like {
        actor: Uuid,
        post_id: Uuid,
        post_author: Uuid,
    },
    Follow {
        follower: Uuid,
        followee: Uuid,
    },
}

impl Edge {
    fn actor(&self) -> Uuid {
        match self {
            Edge::Like { actor, .. } => *actor,
            Edge::Follow { follower, .. } => *follower,
        }
    }

    /// (recipient, kind, related post) for the create branch; None when the
    /// action targets the actor's own content
    fn notification(&self) -> Option<(Uuid, NotificationKind, Option<Uuid>)> {
        match self {
            Edge::Like {
                actor,
                post_id,
                post_author,
            } => {
                if post_author == actor {
                    None
                } else {
                    Some((*post_author, NotificationKind::Like, Some(*post_id)))
                }
            }
            // follower != followee is guaranteed before the edge is built
            Edge::Follow { followee, .. } => Some((*followee, NotificationKind::Follow, None)),
        }
    }
}

#[derive(Clone)]
pub struct EngagementService {
    pool: PgPool,
    likes: LikeRepository,
    follows: FollowRepository,
    notifications: NotificationRepository,
    posts: PostRepository,
    users: UserRepository,
    signal: FeedSignal,
}

impl EngagementService {
    pub fn new(pool: PgPool, signal: FeedSignal) -> Self {
        Self {
            likes: LikeRepository::new(pool.clone()),
            follows: FollowRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            posts: PostRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            signal,
        }
    }

    /// Flip the like edge for (actor, post). Returns the resulting liked
    /// state. Creating the edge notifies the post's author unless the actor
    /// is liking their own post.
    pub async fn toggle_like(&self, actor: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        let post_author = self
            .posts
            .get_author(post_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Post not found".into()))?;

        let liked = self
            .toggle(Edge::Like {
                actor,
                post_id,
                post_author,
            })
            .await?;

        self.signal.feed_changed().await;
        if liked && post_author != actor {
            self.signal.notifications_changed(post_author).await;
        }
        Ok(liked)
    }

    /// Flip the follow edge for (actor, target). Returns the resulting
    /// following state. Self-follow is rejected before any store access.
    pub async fn toggle_follow(&self, actor: Uuid, target: Uuid) -> ServiceResult<bool> {
        if actor == target {
            return Err(ServiceError::InvalidOperation(
                "You cannot follow yourself".into(),
            ));
        }
        if !self.users.exists(target).await? {
            return Err(ServiceError::NotFound("User not found".into()));
        }

        let following = self
            .toggle(Edge::Follow {
                follower: actor,
                followee: target,
            })
            .await?;

        self.signal.feed_changed().await;
        if following {
            self.signal.notifications_changed(target).await;
        }
        Ok(following)
    }

    /// Shared toggle driver. Returns the edge's existence after the call.
    async fn toggle(&self, edge: Edge) -> ServiceResult<bool> {
        if self.edge_exists(&edge).await? {
            self.delete_edge(&edge).await?;
            debug!(?edge, "edge removed");
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        if let Err(e) = self.insert_edge(&mut tx, &edge).await {
            tx.rollback().await?;
            if is_unique_violation(&e) {
                // A concurrent caller created the edge between our probe and
                // insert. The edge exists; report the create branch's result.
                debug!(?edge, "lost duplicate-create race, treating as created");
                return Ok(true);
            }
            return Err(e.into());
        }

        if let Some((recipient, kind, related_post)) = edge.notification() {
            self.notifications
                .insert(&mut tx, recipient, edge.actor(), kind, related_post, None)
                .await?;
        }

        tx.commit().await?;
        debug!(?edge, "edge created");
        Ok(true)
    }

    async fn edge_exists(&self, edge: &Edge) -> ServiceResult<bool> {
        let exists = match edge {
            Edge::Like { actor, post_id, .. } => self.likes.exists(*actor, *post_id).await?,
            Edge::Follow { follower, followee } => {
                self.follows.exists(*follower, *followee).await?
            }
        };
        Ok(exists)
    }

    async fn insert_edge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        edge: &Edge,
    ) -> Result<(), sqlx::Error> {
        match edge {
            Edge::Like { actor, post_id, .. } => {
                self.likes.insert(tx, *actor, *post_id).await?;
            }
            Edge::Follow { follower, followee } => {
                self.follows.insert(tx, *follower, *followee).await?;
            }
        }
        Ok(())
    }

    async fn delete_edge(&self, edge: &Edge) -> ServiceResult<()> {
        match edge {
            Edge::Like { actor, post_id, .. } => {
                self.likes.delete(*actor, *post_id).await?;
            }
            Edge::Follow { follower, followee } => {
                self.follows.delete(*follower, *followee).await?;
            }
        }
        Ok(())
    }
}
