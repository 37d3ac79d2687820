//! Authentication endpoint
//!
//! `POST /auth?action=register|login|verify`. Any other action, or any
//! other method, is a 405.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::authenticate;
use super::method_not_allowed;
use crate::{accounts, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn parse_credentials(body: &Bytes) -> ApiResult<CredentialsRequest> {
    if body.is_empty() {
        return Ok(CredentialsRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// POST /auth
pub async fn auth_handler(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    match query.action.as_deref() {
        Some("register") => register(&state, &body).await,
        Some("login") => login(&state, &body).await,
        Some("verify") => verify(&state, &headers).await,
        _ => Err(ApiError::MethodNotAllowed(
            "Method not allowed or invalid action".to_string(),
        )),
    }
}

async fn register(state: &AppState, body: &Bytes) -> ApiResult<(StatusCode, Json<Value>)> {
    let credentials = parse_credentials(body)?;
    let session = accounts::register(
        &state.db,
        &state.passwords,
        &state.tokens,
        &credentials.username,
        &credentials.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": session.user,
            "token": session.token,
        })),
    ))
}

async fn login(state: &AppState, body: &Bytes) -> ApiResult<(StatusCode, Json<Value>)> {
    let credentials = parse_credentials(body)?;
    let session = accounts::login(
        &state.db,
        &state.passwords,
        &state.tokens,
        &credentials.username,
        &credentials.password,
    )
    .await?
    .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": session.user,
            "token": session.token,
        })),
    ))
}

async fn verify(state: &AppState, headers: &HeaderMap) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = authenticate(state, headers).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "user": user,
        })),
    ))
}

/// Build auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth", post(auth_handler).fallback(method_not_allowed))
}
