//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use athlo_db::entities::profile;

/// Authenticated profile extractor.
#[derive(Debug, Clone)]
pub struct AuthProfile(pub profile::Model);

impl<S> FromRequestParts<S> for AuthProfile
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get profile from request extensions (set by auth middleware)
        parts
            .extensions
            .get::<profile::Model>()
            .cloned()
            .map(AuthProfile)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Optional authenticated profile extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthProfile(pub Option<profile::Model>);

impl<S> FromRequestParts<S> for MaybeAuthProfile
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<profile::Model>().cloned()))
    }
}
