//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use athlo_common::AppResult;
use athlo_db::entities::profile::SportCategory;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Registration request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub sport: SportCategory,
    pub full_name: Option<String>,
}

/// Registration response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Register a new profile.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let input = athlo_core::RegisterProfileInput {
        username: req.username,
        password: req.password,
        sport: req.sport,
        full_name: req.full_name,
    };

    let profile = state.profile_service.register(input).await?;

    Ok(ApiResponse::ok(RegisterResponse {
        id: profile.id.clone(),
        username: profile.username,
        token: profile.token.unwrap_or_default(),
    }))
}

/// Login request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Sign in to an existing profile.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let profile = state
        .profile_service
        .login(&req.username, &req.password)
        .await?;

    Ok(ApiResponse::ok(LoginResponse {
        id: profile.id.clone(),
        username: profile.username,
        token: profile.token.unwrap_or_default(),
    }))
}

/// Logout response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub ok: bool,
}

/// Sign out: clear the profile's token so it no longer authenticates.
async fn logout(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<LogoutResponse>> {
    state.profile_service.clear_token(&profile.id).await?;

    Ok(ApiResponse::ok(LogoutResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}
