//! Follow endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::post,
};
use athlo_common::AppResult;
use serde::Serialize;

use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Follow state response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStateResponse {
    pub following: bool,
}

/// Follow a profile. Idempotent.
async fn follow(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FollowStateResponse>> {
    state.follow_service.follow(&me.id, &id).await?;

    // Notify the followee; a failure here must not fail the follow.
    if let Err(e) = state
        .notification_service
        .notify_follow(&id, &me.id, &me.username)
        .await
    {
        tracing::warn!(error = %e, "Failed to create follow notification");
    }

    Ok(ApiResponse::ok(FollowStateResponse { following: true }))
}

/// Unfollow a profile. Idempotent.
async fn unfollow(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FollowStateResponse>> {
    state.follow_service.unfollow(&me.id, &id).await?;
    Ok(ApiResponse::ok(FollowStateResponse { following: false }))
}

/// Check whether the authenticated profile follows another.
async fn show(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FollowStateResponse>> {
    let following = state.follow_service.is_following(&me.id, &id).await?;
    Ok(ApiResponse::ok(FollowStateResponse { following }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", post(follow).delete(unfollow).get(show))
}
