//! API endpoints.

mod auth;
mod comments;
mod follows;
mod leaderboard;
mod likes;
mod media;
mod notifications;
mod posts;
mod profiles;
mod search;
mod tags;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

/// Default page size for list endpoints.
pub(crate) const fn default_limit() -> u64 {
    20
}

/// Hard cap on page size.
pub(crate) const MAX_LIMIT: u64 = 100;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(likes::router())
        .merge(comments::router())
        .nest("/profiles", profiles::router())
        .nest("/follows", follows::router())
        .nest("/notifications", notifications::router())
        .nest("/tags", tags::router())
        .nest("/search", search::router())
        .nest("/leaderboard", leaderboard::router())
        .nest("/media", media::router())
        .nest("/streaming/sse", sse::router())
}
