//! Leaderboard endpoints.

use axum::{Router, extract::Query, extract::State, routing::get};
use athlo_common::AppResult;
use athlo_db::entities::profile::SportCategory;
use serde::{Deserialize, Serialize};

use crate::endpoints::{MAX_LIMIT, profiles::ProfileResponse};
use crate::{middleware::AppState, response::ApiResponse};

const fn default_leaderboard_limit() -> u64 {
    50
}

/// Leaderboard query.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: u64,
    pub sport: Option<SportCategory>,
}

/// Ranked profile entry.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub profile: ProfileResponse,
}

/// Top profiles by follower count, optionally filtered by sport.
async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<ApiResponse<Vec<LeaderboardEntry>>> {
    let limit = query.limit.min(MAX_LIMIT);
    let profiles = state.profile_service.leaderboard(limit, query.sport).await?;

    let entries = profiles
        .into_iter()
        .enumerate()
        .map(|(i, profile)| LeaderboardEntry {
            rank: i as u32 + 1,
            profile: profile.into(),
        })
        .collect();

    Ok(ApiResponse::ok(entries))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(leaderboard))
}
