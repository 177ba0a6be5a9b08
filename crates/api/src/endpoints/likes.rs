//! Like endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use athlo_common::AppResult;
use athlo_core::EngagementState;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit};
use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Like a post. Idempotent: a repeated like confirms the current state.
async fn like(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<EngagementState>> {
    let post = state.post_service.get(&id).await?;

    let engagement = state.engagement_service.like(&me.id, &id).await?;

    // Notify the post owner (never for self-likes); a failure here must not
    // fail the like itself.
    if let Err(e) = state
        .notification_service
        .notify_like(&post.profile_id, &me.id, &me.username, &id)
        .await
    {
        tracing::warn!(error = %e, "Failed to create like notification");
    }

    Ok(ApiResponse::ok(engagement))
}

/// Remove a like from a post. Idempotent.
async fn unlike(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<EngagementState>> {
    let engagement = state.engagement_service.unlike(&me.id, &id).await?;
    Ok(ApiResponse::ok(engagement))
}

/// List likes query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLikesQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Like response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub id: String,
    pub created_at: String,
    pub profile_id: String,
    pub post_id: String,
}

impl From<athlo_db::entities::like::Model> for LikeResponse {
    fn from(l: athlo_db::entities::like::Model) -> Self {
        Self {
            id: l.id,
            created_at: l.created_at.to_rfc3339(),
            profile_id: l.profile_id,
            post_id: l.post_id,
        }
    }
}

/// Get likes on a post.
async fn likes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<ListLikesQuery>,
) -> AppResult<ApiResponse<Vec<LikeResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let likes = state
        .engagement_service
        .likes_for_post(&id, limit, page.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(likes.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/like", post(like).delete(unlike))
        .route("/posts/{id}/likes", get(likes))
}
