//! User profile and suggestion queries.

use crate::domain::models::{SuggestedUser, UserProfile};
use crate::error::ServiceResult;
use crate::repository::UserRepository;
use sqlx::PgPool;
use uuid::Uuid;

const SUGGESTION_LIMIT: i64 = 3;

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Profile with follower/following/post counts, looked up by the
    /// identity provider's id. None when the identity has never contacted
    /// the service.
    pub async fn get_user(&self, external_id: &str) -> ServiceResult<Option<UserProfile>> {
        Ok(self.users.get_profile(external_id).await?)
    }

    /// Random users the viewer might follow: excludes the viewer and anyone
    /// they already follow
    pub async fn suggested_users(&self, viewer_id: Uuid) -> ServiceResult<Vec<SuggestedUser>> {
        Ok(self.users.suggested_users(viewer_id, SUGGESTION_LIMIT).await?)
    }
}
