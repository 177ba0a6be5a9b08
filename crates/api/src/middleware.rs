//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use athlo_core::{
    CommentService, EngagementService, FollowService, MediaService, NotificationService,
    PostService, ProfileService, TagService,
};

use crate::sse::SseBroadcaster;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub profile_service: ProfileService,
    pub post_service: PostService,
    pub engagement_service: EngagementService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub tag_service: TagService,
    pub media_service: MediaService,
    pub sse_broadcaster: SseBroadcaster,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a profile and stores it in request
/// extensions; endpoints decide through their extractors whether an
/// unauthenticated request is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(profile) = state.profile_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(profile);
    }

    next.run(req).await
}
