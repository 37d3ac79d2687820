//! HTTP API handlers
//!
//! Routes keep the query-parameter style clients already use
//! (`/tracks?id=...`, `/auth?action=...`). Each path has a JSON 405 fallback
//! for methods it does not support.

pub mod auth;
pub mod blob;
pub mod environments;
pub mod extract;
pub mod health;
pub mod sections;
pub mod tracks;

pub use auth::auth_routes;
pub use blob::blob_routes;
pub use environments::environment_routes;
pub use extract::AuthUser;
pub use health::health_routes;
pub use sections::section_routes;
pub use tracks::track_routes;

use crate::ApiError;
use axum::response::IntoResponse;
use uuid::Uuid;

/// Fallback for unsupported methods on a known path
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Fallback for unknown paths
pub async fn not_found() -> impl IntoResponse {
    ApiError::NotFound("Not found".to_string())
}

/// Parse an `?id=` value; anything that is not a UUID cannot name a row
pub(crate) fn parse_id(raw: Option<&str>, missing_message: &str) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Err(ApiError::BadRequest(missing_message.to_string())),
        Some(value) => Ok(Uuid::parse_str(value).ok()),
    }
}
