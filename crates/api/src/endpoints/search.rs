//! Profile search endpoints.

use axum::{Router, extract::Query, extract::State, routing::get};
use athlo_common::AppResult;
use serde::Deserialize;

use crate::endpoints::{MAX_LIMIT, default_limit, profiles::ProfileResponse};
use crate::{middleware::AppState, response::ApiResponse};

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Search profiles by username or full name substring.
async fn profiles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<ProfileResponse>>> {
    let limit = query.limit.min(MAX_LIMIT);
    let profiles = state.profile_service.search(&query.q, limit).await?;

    Ok(ApiResponse::ok(
        profiles.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/profiles", get(profiles))
}
