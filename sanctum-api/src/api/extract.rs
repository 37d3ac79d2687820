//! Bearer-token authentication extractor

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sanctum_common::models::User;
use tracing::debug;

use crate::{accounts, ApiError, AppState};

/// The user behind a valid `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Pull the token out of an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the request's token and load its user
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::unauthorized("Authorization token required"))?;

    let claims = state.tokens.verify_token(token).map_err(|reason| {
        debug!("Rejected session token: {}", reason);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    accounts::find_user(&state.db, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await.map(AuthUser)
    }
}
