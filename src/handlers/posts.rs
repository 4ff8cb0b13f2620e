//! Post, like and comment endpoints.

use super::{ApiResponse, AppState};
use crate::domain::models::Principal;
use crate::error::ServiceResult;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePostPayload {
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentPayload {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct LikeToggled {
    pub liked: bool,
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    payload: web::Json<CreatePostPayload>,
) -> ServiceResult<HttpResponse> {
    let actor = state.identity.require(principal.as_ref()).await?;
    let post = state
        .posts
        .create_post(actor.id, &payload.content, payload.image_url.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// GET /api/v1/posts
///
/// The feed projection is readable anonymously.
pub async fn get_posts(state: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    let feed = state.posts.get_feed().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(feed)))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let actor = state.identity.require(principal.as_ref()).await?;
    state.posts.delete_post(actor.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

/// POST /api/v1/posts/{id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let actor = state.identity.require(principal.as_ref()).await?;
    let liked = state
        .engagement
        .toggle_like(actor.id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeToggled { liked })))
}

/// POST /api/v1/posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    path: web::Path<Uuid>,
    payload: web::Json<CreateCommentPayload>,
) -> ServiceResult<HttpResponse> {
    let actor = state.identity.require(principal.as_ref()).await?;
    let comment = state
        .comments
        .create_comment(actor.id, path.into_inner(), &payload.content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}
