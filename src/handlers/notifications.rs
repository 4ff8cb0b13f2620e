//! Notification endpoints.

use super::{ApiResponse, AppState};
use crate::domain::models::Principal;
use crate::error::ServiceResult;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MarkReadPayload {
    pub ids: Vec<Uuid>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    principal: Option<Principal>,
) -> ServiceResult<HttpResponse> {
    let recipient = state.identity.require(principal.as_ref()).await?;
    let notifications = state.notifications.list(recipient.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

/// POST /api/v1/notifications/read
pub async fn mark_read(
    state: web::Data<AppState>,
    principal: Option<Principal>,
    payload: web::Json<MarkReadPayload>,
) -> ServiceResult<HttpResponse> {
    let recipient = state.identity.require(principal.as_ref()).await?;
    let updated = state
        .notifications
        .mark_read(recipient.id, &payload.ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "updated": updated }))))
}
