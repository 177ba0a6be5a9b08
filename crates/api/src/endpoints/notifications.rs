//! Notification endpoints.
//!
//! Read acknowledgement is explicit: listing never marks anything read;
//! clients call the read endpoints deliberately.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use athlo_common::AppResult;
use athlo_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit};
use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub kind: notification::NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    pub body: String,
    pub is_read: bool,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            created_at: n.created_at.to_rfc3339(),
            sender_id: n.sender_id,
            kind: n.kind,
            post_id: n.post_id,
            comment_id: n.comment_id,
            body: n.body,
            is_read: n.is_read,
        }
    }
}

/// List notifications query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

/// List the authenticated profile's notifications, newest first.
async fn list(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Query(page): Query<ListNotificationsQuery>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let notifications = state
        .notification_service
        .list(&me.id, limit, page.until_id.as_deref(), page.unread_only)
        .await?;

    Ok(ApiResponse::ok(
        notifications.into_iter().map(Into::into).collect(),
    ))
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Count unread notifications.
async fn unread_count(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.count_unread(&me.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Mark one notification as read.
async fn mark_read(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.mark_read(&me.id, &id).await?;
    Ok(ApiResponse::ok(()))
}

/// Marked count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub marked: u64,
}

/// Mark all notifications as read.
async fn mark_all_read(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllReadResponse>> {
    let marked = state.notification_service.mark_all_read(&me.id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { marked }))
}

/// Delete a notification.
async fn remove(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.delete(&me.id, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}/read", post(mark_read))
        .route("/{id}", delete(remove))
}
