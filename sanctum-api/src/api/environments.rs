//! Environment endpoints
//!
//! `PUT` is a full replace: a slot omitted from the body is cleared.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use sanctum_common::models::{Environment, EnvironmentTracks, TrackRefs, TrackSummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{method_not_allowed, parse_id, AuthUser};
use crate::db::environments;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct EnvironmentQuery {
    pub id: Option<String>,
}

/// Body of `POST /environments` and `PUT /environments?id=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRequest {
    #[serde(default)]
    pub name: String,
    pub combat_track_id: Option<String>,
    pub exploration_track_id: Option<String>,
    #[serde(alias = "sneakTrackId")]
    pub tension_track_id: Option<String>,
}

const FOREIGN_TRACKS: &str = "Some track IDs are invalid or do not belong to you";

fn parse_slot(raw: Option<&str>) -> ApiResult<Option<Uuid>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(FOREIGN_TRACKS.to_string())),
    }
}

impl EnvironmentRequest {
    fn track_refs(&self) -> ApiResult<TrackRefs> {
        Ok(TrackRefs {
            combat: parse_slot(self.combat_track_id.as_deref())?,
            exploration: parse_slot(self.exploration_track_id.as_deref())?,
            tension: parse_slot(self.tension_track_id.as_deref())?,
        })
    }
}

/// Environment as rendered to clients
///
/// Slot tracks appear twice: flat (`combat_track`, ...) and grouped under
/// `tracks`, because both shapes are in use by clients.
#[derive(Debug, Serialize)]
pub struct EnvironmentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub combat_track_id: Option<Uuid>,
    pub exploration_track_id: Option<Uuid>,
    pub tension_track_id: Option<Uuid>,
    pub combat_track: Option<TrackSummary>,
    pub exploration_track: Option<TrackSummary>,
    pub tension_track: Option<TrackSummary>,
    pub tracks: EnvironmentTracks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Environment> for EnvironmentView {
    fn from(env: Environment) -> Self {
        let tracks = env.tracks;
        Self {
            id: env.id,
            user_id: env.user_id,
            name: env.name,
            combat_track_id: tracks.combat.as_ref().map(|t| t.id),
            exploration_track_id: tracks.exploration.as_ref().map(|t| t.id),
            tension_track_id: tracks.tension.as_ref().map(|t| t.id),
            combat_track: tracks.combat.clone(),
            exploration_track: tracks.exploration.clone(),
            tension_track: tracks.tension.clone(),
            tracks,
            created_at: env.created_at,
            updated_at: env.updated_at,
        }
    }
}

/// GET /environments
pub async fn list_environments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let list: Vec<EnvironmentView> = environments::list_environments(&state.db, user.id)
        .await?
        .into_iter()
        .map(EnvironmentView::from)
        .collect();

    Ok(Json(json!({ "success": true, "environments": list })))
}

/// POST /environments
pub async fn create_environment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<EnvironmentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let refs = request.track_refs()?;

    let env = environments::create_environment(&state.db, user.id, &request.name, refs).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Environment created successfully",
        "environment": EnvironmentView::from(env),
    })))
}

/// PUT /environments?id=
pub async fn update_environment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<EnvironmentQuery>,
    payload: Result<Json<EnvironmentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(query.id.as_deref(), "Environment ID is required")?
        .ok_or_else(|| ApiError::NotFound("Environment not found".to_string()))?;
    let Json(request) = payload?;
    let refs = request.track_refs()?;

    let env = environments::update_environment(&state.db, id, user.id, &request.name, refs).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Environment updated successfully",
        "environment": EnvironmentView::from(env),
    })))
}

/// DELETE /environments?id=
pub async fn delete_environment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<EnvironmentQuery>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(query.id.as_deref(), "Environment ID is required")?
        .ok_or_else(|| ApiError::NotFound("Environment not found".to_string()))?;

    environments::delete_environment(&state.db, id, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Environment deleted successfully",
    })))
}

/// Build environment routes
pub fn environment_routes() -> Router<AppState> {
    Router::new().route(
        "/environments",
        get(list_environments)
            .post(create_environment)
            .put(update_environment)
            .delete(delete_environment)
            .fallback(method_not_allowed),
    )
}
