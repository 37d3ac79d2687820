//! Blob storage
//!
//! Raw audio bytes live behind the [`BlobStore`] trait. Track metadata only
//! records the URL a backend hands back; deleting goes through that URL.

pub mod filesystem;
pub mod http;

pub use filesystem::FilesystemBlobStore;
pub use http::HttpBlobStore;

use async_trait::async_trait;
use axum::body::Bytes;
use sanctum_common::models::TrackType;
use thiserror::Error;
use uuid::Uuid;

/// Blob storage errors
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// Location of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Public URL clients fetch the bytes from
    pub url: String,
    pub key: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> BlobResult<StoredBlob>;

    /// Delete the object behind a URL previously returned by [`put`](Self::put)
    async fn delete(&self, url: &str) -> BlobResult<()>;

    /// Key behind a URL this store issued, or `None` for URLs it does not manage
    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Key prefix every upload by `user_id` lives under
pub fn owner_prefix(user_id: Uuid) -> String {
    format!("tracks/{}/", user_id)
}

/// Storage key for an uploaded track: `tracks/<user>/<type>/<millis>-<name>`
pub fn track_key(user_id: Uuid, track_type: TrackType, filename: &str, unix_millis: i64) -> String {
    format!(
        "{}{}/{}-{}",
        owner_prefix(user_id),
        track_type,
        unix_millis,
        sanitize_filename(filename)
    )
}

/// True when `key` sits under the owner's prefix and could have come from [`track_key`]
///
/// Only characters `track_key` emits are allowed and no segment may be `.` or
/// `..`, so a key cannot climb out of the prefix once a backend resolves it.
pub fn is_owned_key(key: &str, owner_id: Uuid) -> bool {
    let Some(rest) = key.strip_prefix(owner_prefix(owner_id).as_str()) else {
        return false;
    };

    let charset_ok = rest
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'));

    charset_ok
        && !rest.is_empty()
        && rest
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Map a URL issued under `base` back to its key
pub(crate) fn key_from_url<'a>(base: &str, url: &'a str) -> BlobResult<&'a str> {
    url.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .ok_or_else(|| BlobError::NotFound(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Battle Theme (v2).mp3"), "Battle_Theme__v2_.mp3");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("rain-loop.ogg"), "rain-loop.ogg");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_track_key_layout() {
        let user = Uuid::new_v4();
        let key = track_key(user, TrackType::Effect, "boom!.wav", 1_700_000_000_000);
        assert_eq!(key, format!("tracks/{}/effect/1700000000000-boom_.wav", user));
    }

    #[test]
    fn test_is_owned_key() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let key = track_key(owner, TrackType::Music, "song.mp3", 1);

        assert!(is_owned_key(&key, owner));
        assert!(!is_owned_key(&key, other));
        assert!(!is_owned_key(&owner_prefix(owner), owner));
        assert!(!is_owned_key(&format!("{}../{}/music/1-a.mp3", owner_prefix(owner), other), owner));
        assert!(!is_owned_key(&format!("{}music//a.mp3", owner_prefix(owner)), owner));
        assert!(!is_owned_key(&format!("{}music/%2e%2e/a.mp3", owner_prefix(owner)), owner));
        assert!(!is_owned_key("tracks/a.mp3", owner));
    }

    #[test]
    fn test_key_from_url() {
        let base = "http://localhost:5780/blob/files";
        assert_eq!(
            key_from_url(base, "http://localhost:5780/blob/files/tracks/a.mp3").unwrap(),
            "tracks/a.mp3"
        );
        assert!(key_from_url(base, "http://elsewhere/tracks/a.mp3").is_err());
        assert!(key_from_url(base, "http://localhost:5780/blob/files/").is_err());
        assert!(key_from_url(base, "http://localhost:5780/blob/filesx/a").is_err());
    }
}
