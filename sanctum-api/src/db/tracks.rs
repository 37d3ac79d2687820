//! Track store
//!
//! Metadata for uploaded audio. The bytes themselves are already in the blob
//! store by the time a track row is written.

use sanctum_common::models::{is_allowed_mime_type, NewTrack, Track, TrackType, MAX_TRACK_FILE_SIZE};
use sanctum_common::time::{from_storage, to_storage};
use sanctum_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::parse_uuid;
use crate::blob::{is_owned_key, BlobStore};

const TRACK_COLUMNS: &str =
    "id, user_id, name, filename, url, type, file_size, mime_type, created_at";

fn row_to_track(row: &SqliteRow) -> Result<Track> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let track_type: String = row.get("type");
    let created_at: String = row.get("created_at");

    Ok(Track {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        name: row.get("name"),
        filename: row.get("filename"),
        url: row.get("url"),
        track_type: track_type.parse::<TrackType>()?,
        file_size: row.get("file_size"),
        mime_type: row.get("mime_type"),
        created_at: from_storage(&created_at)?,
    })
}

/// Check upload constraints shared by metadata creation and direct upload
pub fn validate_upload(mime_type: &str, file_size: i64) -> Result<()> {
    if !is_allowed_mime_type(mime_type) {
        return Err(Error::InvalidInput(
            "Invalid file type. Only audio files are allowed.".to_string(),
        ));
    }
    if file_size <= 0 {
        return Err(Error::InvalidInput("File is empty".to_string()));
    }
    if file_size > MAX_TRACK_FILE_SIZE {
        return Err(Error::InvalidInput(
            "File too large. Maximum size is 50MB.".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_track(track: &NewTrack) -> Result<()> {
    if track.name.trim().is_empty() || track.filename.trim().is_empty() || track.url.trim().is_empty()
    {
        return Err(Error::InvalidInput(
            "Missing required fields: name, filename, url, type, fileSize, mimeType".to_string(),
        ));
    }
    validate_upload(&track.mime_type, track.file_size)
}

/// Reject a track URL that points into the blob store outside the owner's prefix
///
/// URLs the store does not manage are accepted as opaque locations.
pub fn check_blob_url(blobs: &dyn BlobStore, owner_id: Uuid, url: &str) -> Result<()> {
    match blobs.key_for_url(url.trim()) {
        Some(key) if !is_owned_key(key, owner_id) => Err(Error::InvalidInput(
            "File URL does not belong to you".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Record metadata for a stored blob
pub async fn create_track(pool: &SqlitePool, owner_id: Uuid, new_track: NewTrack) -> Result<Track> {
    validate_new_track(&new_track)?;

    let track = Track {
        id: Uuid::new_v4(),
        user_id: owner_id,
        name: new_track.name.trim().to_string(),
        filename: new_track.filename,
        url: new_track.url,
        track_type: new_track.track_type,
        file_size: new_track.file_size,
        mime_type: new_track.mime_type,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO tracks (id, user_id, name, filename, url, type, file_size, mime_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(track.id.to_string())
    .bind(owner_id.to_string())
    .bind(&track.name)
    .bind(&track.filename)
    .bind(&track.url)
    .bind(track.track_type.as_str())
    .bind(track.file_size)
    .bind(&track.mime_type)
    .bind(to_storage(track.created_at))
    .execute(pool)
    .await?;

    info!(track_id = %track.id, user_id = %owner_id, track_type = %track.track_type, "Track created");
    Ok(track)
}

/// Owner's tracks, newest first, optionally limited to one type
pub async fn list_tracks(
    pool: &SqlitePool,
    owner_id: Uuid,
    track_type: Option<TrackType>,
) -> Result<Vec<Track>> {
    let rows = match track_type {
        Some(track_type) => {
            sqlx::query(&format!(
                "SELECT {} FROM tracks WHERE user_id = ? AND type = ? ORDER BY created_at DESC, rowid DESC",
                TRACK_COLUMNS
            ))
            .bind(owner_id.to_string())
            .bind(track_type.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM tracks WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                TRACK_COLUMNS
            ))
            .bind(owner_id.to_string())
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(row_to_track).collect()
}

pub async fn get_track(pool: &SqlitePool, id: Uuid, owner_id: Uuid) -> Result<Option<Track>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM tracks WHERE id = ? AND user_id = ?",
        TRACK_COLUMNS
    ))
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_track).transpose()
}

/// Delete the metadata row only
///
/// Environment slots pointing at the track are cleared by the schema.
pub async fn delete_track(pool: &SqlitePool, id: Uuid, owner_id: Uuid) -> Result<Track> {
    let row = sqlx::query(&format!(
        "DELETE FROM tracks WHERE id = ? AND user_id = ? RETURNING {}",
        TRACK_COLUMNS
    ))
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => row_to_track(&row),
        None => Err(Error::NotFound("Track not found".to_string())),
    }
}

/// Delete the row, then make a best-effort attempt at the backing blob
///
/// Only blobs under the owner's key prefix are touched. A blob failure is
/// logged and swallowed; the track is gone either way.
pub async fn delete_track_and_blob(
    pool: &SqlitePool,
    blobs: &dyn BlobStore,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Track> {
    let track = delete_track(pool, id, owner_id).await?;

    match blobs.key_for_url(&track.url) {
        Some(key) if is_owned_key(key, owner_id) => {
            if let Err(e) = blobs.delete(&track.url).await {
                warn!(track_id = %track.id, url = %track.url, "Failed to delete track blob: {}", e);
            }
        }
        Some(_) => {
            warn!(track_id = %track.id, url = %track.url, "Track URL is outside the owner's blob prefix; blob left in place");
        }
        None => {
            debug!(track_id = %track.id, url = %track.url, "Track URL not managed by the blob store");
        }
    }

    info!(track_id = %track.id, user_id = %owner_id, "Track deleted");
    Ok(track)
}
