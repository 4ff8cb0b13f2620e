//! User profile, suggestion and follow endpoints.

use super::{ApiResponse, AppState};
use crate::domain::models::Principal;
use crate::error::{ServiceError, ServiceResult};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct FollowToggled {
    pub following: bool,
}

/// POST /api/v1/users/{id}/follow
pub async fn toggle_follow(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let actor = state.identity.require(principal.as_ref()).await?;
    let following = state
        .engagement
        .toggle_follow(actor.id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FollowToggled { following })))
}

/// GET /api/v1/users/{external_id}
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let profile = state
        .users
        .get_user(&path.into_inner())
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

/// GET /api/v1/users/suggestions
///
/// Empty list for anonymous callers; suggestions only make sense relative to
/// a viewer's follow graph.
pub async fn suggestions(
    state: web::Data<AppState>,
    principal: Option<Principal>,
) -> ServiceResult<HttpResponse> {
    let viewer = state.identity.resolve(principal.as_ref()).await?;
    let users = match viewer {
        Some(viewer) => state.users.suggested_users(viewer.id).await?,
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}
