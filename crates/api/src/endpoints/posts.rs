//! Post endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use athlo_common::AppResult;
use athlo_db::entities::{post, profile};
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit};
use crate::{
    extractors::{AuthProfile, MaybeAuthProfile},
    middleware::AppState,
    response::ApiResponse,
};

/// Post response with author card, tags and viewer engagement.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub media_type: post::MediaType,
    pub likes_count: i32,
    pub comments_count: i32,
    pub tags: Vec<String>,
    pub author: super::profiles::ProfileResponse,
    /// Whether the requesting profile has liked this post (absent when
    /// unauthenticated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

/// Assemble post responses: author cards, tag names, and the viewer's
/// per-post liked flags in one batch.
pub(crate) async fn build_responses(
    state: &AppState,
    viewer: Option<&profile::Model>,
    posts: Vec<post::Model>,
) -> AppResult<Vec<PostResponse>> {
    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();

    let liked_ids = match viewer {
        Some(viewer) => Some(
            state
                .engagement_service
                .liked_post_ids(&viewer.id, &post_ids)
                .await?,
        ),
        None => None,
    };

    let mut result = Vec::with_capacity(posts.len());
    for post in posts {
        let author = state.profile_service.get(&post.profile_id).await?;
        let tags = state
            .tag_service
            .tags_for_post(&post.id)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();

        let liked = liked_ids
            .as_ref()
            .map(|ids| ids.contains(&post.id));

        result.push(PostResponse {
            id: post.id,
            created_at: post.created_at.to_rfc3339(),
            caption: post.caption,
            media_urls: post
                .media_urls
                .as_array()
                .map(|urls| {
                    urls.iter()
                        .filter_map(|v| v.as_str().map(ToString::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            media_type: post.media_type,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            tags,
            author: author.into(),
            liked,
        });
    }

    Ok(result)
}

/// Assemble a single post response.
pub(crate) async fn build_response(
    state: &AppState,
    viewer: Option<&profile::Model>,
    post: post::Model,
) -> AppResult<PostResponse> {
    let mut responses = build_responses(state, viewer, vec![post]).await?;
    responses
        .pop()
        .ok_or_else(|| athlo_common::AppError::Internal("Post response vanished".to_string()))
}

/// Create post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub media_type: post::MediaType,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Create a post from already-uploaded media.
async fn create(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let input = athlo_core::CreatePostInput {
        caption: req.caption,
        media_urls: req.media_urls,
        media_type: req.media_type,
        tags: req.tags,
    };

    let created = state.post_service.create(&me.id, input).await?;
    Ok(ApiResponse::ok(
        build_response(&state, Some(&me), created).await?,
    ))
}

/// Get a post by ID.
async fn show(
    MaybeAuthProfile(viewer): MaybeAuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.get(&id).await?;
    Ok(ApiResponse::ok(
        build_response(&state, viewer.as_ref(), post).await?,
    ))
}

/// Delete a post. Owner only; dependent rows cascade in one transaction
/// and the post's media objects are removed best-effort afterwards.
async fn remove(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    let media_urls = state.post_service.delete(&me.id, &id).await?;
    state.media_service.delete_by_urls(&media_urls).await;

    Ok(ApiResponse::ok(()))
}

/// Pagination query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Global feed: recent posts from everyone.
async fn feed(
    MaybeAuthProfile(viewer): MaybeAuthProfile,
    State(state): State<AppState>,
    Query(page): Query<FeedQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let posts = state
        .post_service
        .feed(limit, page.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        build_responses(&state, viewer.as_ref(), posts).await?,
    ))
}

/// Home feed: posts from followed profiles and the viewer.
async fn home_feed(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Query(page): Query<FeedQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let followees = state.follow_service.followee_ids(&me.id).await?;
    let posts = state
        .post_service
        .home_feed(&me.id, followees, limit, page.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        build_responses(&state, Some(&me), posts).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create))
        .route("/posts/{id}", get(show).delete(remove))
        .route("/feed", get(feed))
        .route("/feed/home", get(home_feed))
}
