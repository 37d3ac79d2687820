//! Direct upload endpoint
//!
//! `POST /blob/direct-upload` takes `multipart/form-data` with a `file`
//! part and an optional `type` part (defaults to `ambient`). The bytes go to
//! the blob store; the client then registers the returned URL via
//! `POST /tracks`.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use sanctum_common::models::{TrackType, MAX_TRACK_FILE_SIZE};
use serde_json::{json, Value};
use tracing::info;

use super::{method_not_allowed, AuthUser};
use crate::blob::{sanitize_filename, track_key};
use crate::db::tracks::validate_upload;
use crate::{ApiError, ApiResult, AppState};

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Bytes,
}

/// POST /blob/direct-upload
pub async fn direct_upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut file: Option<UploadedFile> = None;
    let mut track_type = TrackType::Ambient;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("type") => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    track_type = value.parse::<TrackType>()?;
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("No file found in upload".to_string()))?;

    let size = file.bytes.len() as i64;
    if size > MAX_TRACK_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge(
            "File too large. Maximum size is 50MB.".to_string(),
        ));
    }
    validate_upload(&file.content_type, size)?;

    let key = track_key(user.id, track_type, &file.filename, Utc::now().timestamp_millis());
    let stored = state.blobs.put(&key, file.bytes, &file.content_type).await?;

    info!(
        user_id = %user.id,
        key = %stored.key,
        size = stored.size,
        backend = state.blobs.backend_name(),
        "Blob uploaded"
    );

    Ok(Json(json!({
        "success": true,
        "url": stored.url,
        "filename": sanitize_filename(&file.filename),
        "size": stored.size,
        "contentType": file.content_type,
    })))
}

/// Build blob routes
pub fn blob_routes() -> Router<AppState> {
    Router::new().route(
        "/blob/direct-upload",
        post(direct_upload).fallback(method_not_allowed),
    )
}
