//! sanctum-api library interface
//!
//! Exposes the router, state and stores for the binary and for
//! integration tests.

pub mod accounts;
pub mod api;
pub mod blob;
pub mod cli;
pub mod db;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use sanctum_common::auth::{PasswordService, TokenService};
use sanctum_common::config::{RunMode, DEFAULT_REQUEST_TIMEOUT_SECS};
use sanctum_common::models::MAX_TRACK_FILE_SIZE;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blob::BlobStore;

/// Headroom on top of the file size limit for multipart framing and fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Session token issuer/verifier
    pub tokens: TokenService,
    /// Password hasher
    pub passwords: PasswordService,
    /// Where uploaded bytes go
    pub blobs: Arc<dyn BlobStore>,
    /// Directory served under `/blob/files` when blobs live on local disk
    pub blob_files_root: Option<PathBuf>,
    pub mode: RunMode,
    pub request_timeout: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: TokenService,
        passwords: PasswordService,
        blobs: Arc<dyn BlobStore>,
        mode: RunMode,
    ) -> Self {
        Self {
            db,
            tokens,
            passwords,
            blobs,
            blob_files_root: None,
            mode,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            startup_time: Utc::now(),
        }
    }

    pub fn with_blob_files_root(mut self, root: PathBuf) -> Self {
        self.blob_files_root = Some(root);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut router = Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::track_routes())
        .merge(api::environment_routes())
        .merge(api::section_routes())
        .merge(
            api::blob_routes()
                .layer(DefaultBodyLimit::max(MAX_TRACK_FILE_SIZE as usize + MULTIPART_OVERHEAD)),
        );

    if let Some(root) = &state.blob_files_root {
        router = router.nest_service("/blob/files", ServeDir::new(root));
    }

    let mut router = router.fallback(api::not_found);

    if !state.mode.is_production() {
        router = router.layer(middleware::from_fn(error::attach_error_detail));
    }

    router
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
