//! Profile endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use athlo_common::AppResult;
use athlo_db::entities::profile;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit, posts::PostResponse};
use crate::{
    extractors::{AuthProfile, MaybeAuthProfile},
    middleware::AppState,
    response::ApiResponse,
};

/// Public profile card.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub sport: profile::SportCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub is_verified: bool,
    pub followers_count: i32,
    pub following_count: i32,
    pub posts_count: i32,
    pub created_at: String,
}

impl From<profile::Model> for ProfileResponse {
    fn from(p: profile::Model) -> Self {
        Self {
            id: p.id,
            username: p.username,
            full_name: p.full_name,
            bio: p.bio,
            location: p.location,
            sport: p.sport,
            profile_image_url: p.profile_image_url,
            cover_image_url: p.cover_image_url,
            is_verified: p.is_verified,
            followers_count: p.followers_count,
            following_count: p.following_count,
            posts_count: p.posts_count,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Get a profile by ID.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.profile_service.get(&id).await?;
    Ok(ApiResponse::ok(profile.into()))
}

/// Get a profile by username.
async fn show_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = state.profile_service.get_by_username(&username).await?;
    Ok(ApiResponse::ok(profile.into()))
}

/// Update request for the authenticated profile.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub sport: Option<profile::SportCategory>,
    pub profile_image_url: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Update the authenticated profile.
async fn update_me(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let input = athlo_core::UpdateProfileInput {
        full_name: req.full_name,
        bio: req.bio,
        location: req.location,
        sport: req.sport,
        profile_image_url: req.profile_image_url,
        cover_image_url: req.cover_image_url,
    };

    let updated = state.profile_service.update(&me.id, input).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Recount the authenticated profile's counters from the backing rows.
async fn reconcile_me(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let repaired = state.profile_service.reconcile_counters(&me.id).await?;
    Ok(ApiResponse::ok(repaired.into()))
}

/// Pagination query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// A follow edge joined with the other profile's card.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdgeResponse {
    pub follow_id: String,
    pub created_at: String,
    pub profile: ProfileResponse,
}

/// List a profile's followers.
async fn followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<FollowEdgeResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let edges = state
        .follow_service
        .get_followers(&id, limit, page.until_id.as_deref())
        .await?;

    let mut result = Vec::with_capacity(edges.len());
    for edge in edges {
        let profile = state.profile_service.get(&edge.follower_id).await?;
        result.push(FollowEdgeResponse {
            follow_id: edge.id,
            created_at: edge.created_at.to_rfc3339(),
            profile: profile.into(),
        });
    }

    Ok(ApiResponse::ok(result))
}

/// List the profiles a profile is following.
async fn following(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<FollowEdgeResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let edges = state
        .follow_service
        .get_following(&id, limit, page.until_id.as_deref())
        .await?;

    let mut result = Vec::with_capacity(edges.len());
    for edge in edges {
        let profile = state.profile_service.get(&edge.followee_id).await?;
        result.push(FollowEdgeResponse {
            follow_id: edge.id,
            created_at: edge.created_at.to_rfc3339(),
            profile: profile.into(),
        });
    }

    Ok(ApiResponse::ok(result))
}

/// List a profile's posts.
async fn posts(
    MaybeAuthProfile(viewer): MaybeAuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let posts = state
        .post_service
        .posts_by_profile(&id, limit, page.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        crate::endpoints::posts::build_responses(&state, viewer.as_ref(), posts).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", patch(update_me))
        .route("/me/reconcile", post(reconcile_me))
        .route("/by-username/{username}", get(show_by_username))
        .route("/{id}", get(show))
        .route("/{id}/followers", get(followers))
        .route("/{id}/following", get(following))
        .route("/{id}/posts", get(posts))
}
