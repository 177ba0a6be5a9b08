//! Tag endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use athlo_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit, posts::PostResponse};
use crate::{extractors::MaybeAuthProfile, middleware::AppState, response::ApiResponse};

/// Tag response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub posts_count: i32,
}

impl From<athlo_db::entities::tag::Model> for TagResponse {
    fn from(t: athlo_db::entities::tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            posts_count: t.posts_count,
        }
    }
}

/// Tag search query.
#[derive(Debug, Deserialize)]
pub struct TagSearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Search tags by prefix.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<TagSearchQuery>,
) -> AppResult<ApiResponse<Vec<TagResponse>>> {
    let limit = query.limit.min(MAX_LIMIT);
    let tags = state.tag_service.search(&query.q, limit).await?;
    Ok(ApiResponse::ok(tags.into_iter().map(Into::into).collect()))
}

/// Popular tags query.
#[derive(Debug, Deserialize)]
pub struct PopularTagsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Get popular tags by post count.
async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularTagsQuery>,
) -> AppResult<ApiResponse<Vec<TagResponse>>> {
    let limit = query.limit.min(MAX_LIMIT);
    let tags = state.tag_service.popular(limit).await?;
    Ok(ApiResponse::ok(tags.into_iter().map(Into::into).collect()))
}

/// Posts-under-tag query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPostsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// List posts linked to a tag.
async fn posts(
    MaybeAuthProfile(viewer): MaybeAuthProfile,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(page): Query<TagPostsQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let tag = state.tag_service.get_by_name(&name).await?;
    let posts = state
        .post_service
        .posts_by_tag(&tag.id, limit, page.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        crate::endpoints::posts::build_responses(&state, viewer.as_ref(), posts).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/popular", get(popular))
        .route("/{name}/posts", get(posts))
}
