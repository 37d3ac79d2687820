//! Track endpoints
//!
//! - `GET /tracks[?type=]` lists the caller's tracks
//! - `GET /tracks?id=` fetches one
//! - `POST /tracks` records metadata for an uploaded blob
//! - `DELETE /tracks?id=` removes the track and its blob

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use sanctum_common::models::{NewTrack, TrackType};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{method_not_allowed, parse_id, AuthUser};
use crate::db::tracks;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub track_type: Option<String>,
}

/// Body of `POST /tracks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackRequest {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub track_type: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
}

impl CreateTrackRequest {
    fn into_new_track(self) -> ApiResult<NewTrack> {
        let missing = || {
            ApiError::BadRequest(
                "Missing required fields: name, filename, url, type, fileSize, mimeType"
                    .to_string(),
            )
        };

        let track_type = self.track_type.ok_or_else(missing)?;
        Ok(NewTrack {
            name: self.name.ok_or_else(missing)?,
            filename: self.filename.ok_or_else(missing)?,
            url: self.url.ok_or_else(missing)?,
            track_type: track_type.parse::<TrackType>()?,
            file_size: self.file_size.ok_or_else(missing)?,
            mime_type: self.mime_type.ok_or_else(missing)?,
        })
    }
}

/// GET /tracks
pub async fn get_tracks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TrackQuery>,
) -> ApiResult<Json<Value>> {
    if query.id.is_some() {
        let id = parse_id(query.id.as_deref(), "Track ID is required")?;
        let track = match id {
            Some(id) => tracks::get_track(&state.db, id, user.id).await?,
            None => None,
        }
        .ok_or_else(|| ApiError::NotFound("Track not found".to_string()))?;

        return Ok(Json(json!({ "success": true, "track": track })));
    }

    // An unrecognized type filter lists everything
    let filter = query
        .track_type
        .as_deref()
        .and_then(|t| t.parse::<TrackType>().ok());
    let list = tracks::list_tracks(&state.db, user.id, filter).await?;

    Ok(Json(json!({ "success": true, "tracks": list })))
}

/// POST /tracks
pub async fn create_track(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTrackRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let new_track = request.into_new_track()?;
    tracks::check_blob_url(state.blobs.as_ref(), user.id, &new_track.url)?;

    let track = tracks::create_track(&state.db, user.id, new_track).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Track uploaded successfully",
        "track": track,
    })))
}

/// DELETE /tracks?id=
pub async fn delete_track(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TrackQuery>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(query.id.as_deref(), "Track ID is required")?
        .ok_or_else(|| ApiError::NotFound("Track not found".to_string()))?;

    let track = tracks::delete_track_and_blob(&state.db, state.blobs.as_ref(), id, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Track deleted successfully",
        "track": track,
    })))
}

/// Build track routes
pub fn track_routes() -> Router<AppState> {
    Router::new().route(
        "/tracks",
        get(get_tracks)
            .post(create_track)
            .delete(delete_track)
            .fallback(method_not_allowed),
    )
}
