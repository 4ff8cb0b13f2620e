pub mod notifications;
pub mod posts;
pub mod principal;
pub mod users;

use crate::services::{
    CommentService, EngagementService, IdentityResolver, NotificationService, PostService,
    UserService,
};
use actix_web::web;
use serde::Serialize;

/// Services shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityResolver,
    pub engagement: EngagementService,
    pub comments: CommentService,
    pub posts: PostService,
    pub notifications: NotificationService,
    pub users: UserService,
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Route table
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/posts", web::post().to(posts::create_post))
            .route("/posts", web::get().to(posts::get_posts))
            .route("/posts/{id}", web::delete().to(posts::delete_post))
            .route("/posts/{id}/like", web::post().to(posts::toggle_like))
            .route("/posts/{id}/comments", web::post().to(posts::create_comment))
            .route("/users/suggestions", web::get().to(users::suggestions))
            .route("/users/{id}/follow", web::post().to(users::toggle_follow))
            .route("/users/{external_id}", web::get().to(users::get_user))
            .route(
                "/notifications",
                web::get().to(notifications::list_notifications),
            )
            .route(
                "/notifications/read",
                web::post().to(notifications::mark_read),
            ),
    );
}
