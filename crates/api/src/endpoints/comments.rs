//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, post},
};
use athlo_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, default_limit};
use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub body: String,
}

/// Comment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub created_at: String,
    pub profile_id: String,
    pub post_id: String,
    pub body: String,
}

impl From<athlo_db::entities::comment::Model> for CommentResponse {
    fn from(c: athlo_db::entities::comment::Model) -> Self {
        Self {
            id: c.id,
            created_at: c.created_at.to_rfc3339(),
            profile_id: c.profile_id,
            post_id: c.post_id,
            body: c.body,
        }
    }
}

/// Add a comment to a post.
async fn create(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let post = state.post_service.get(&id).await?;

    let comment = state.comment_service.add(&me.id, &id, &req.body).await?;

    // Notify the post owner (never for self-comments); failures must not
    // fail the comment itself.
    if let Err(e) = state
        .notification_service
        .notify_comment(&post.profile_id, &me.id, &me.username, &id, &comment.id)
        .await
    {
        tracing::warn!(error = %e, "Failed to create comment notification");
    }

    Ok(ApiResponse::ok(comment.into()))
}

/// List comments query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub since_id: Option<String>,
}

/// List comments on a post, oldest first.
async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<ListCommentsQuery>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let limit = page.limit.min(MAX_LIMIT);
    let comments = state
        .comment_service
        .list(&id, limit, page.since_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Delete a comment (author or post owner).
async fn remove(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&me.id, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", post(create).get(list))
        .route("/comments/{id}", delete(remove))
}
