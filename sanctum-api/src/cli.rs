//! Command-line interface and service wiring

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use sanctum_common::auth::{PasswordService, TokenService};
use sanctum_common::config::{BlobBackend, Overrides, RunMode, Secret, Settings};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::blob::{BlobStore, FilesystemBlobStore, HttpBlobStore};
use crate::AppState;

/// Command-line arguments for sanctum-api
///
/// Every setting flag can also be supplied through its environment variable;
/// the flag wins when both are present.
#[derive(Parser, Debug)]
#[command(name = "sanctum-api")]
#[command(about = "Ambience Sanctum API service")]
#[command(version)]
pub struct Cli {
    /// TOML config file
    #[arg(long, env = "SANCTUM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Run mode: development or production
    #[arg(long, env = "SANCTUM_MODE", global = true)]
    pub mode: Option<RunMode>,

    /// Listen address
    #[arg(long, env = "SANCTUM_BIND", global = true)]
    pub bind: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "SANCTUM_REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,

    /// Database URL, e.g. sqlite:///var/lib/sanctum/sanctum.db
    #[arg(long, env = "SANCTUM_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Session token signing secret
    #[arg(long, env = "SANCTUM_TOKEN_SECRET", hide_env_values = true, global = true)]
    pub token_secret: Option<String>,

    /// Blob backend: filesystem or http
    #[arg(long, env = "SANCTUM_BLOB_BACKEND", global = true)]
    pub blob_backend: Option<BlobBackend>,

    /// Root directory for the filesystem blob backend
    #[arg(long, env = "SANCTUM_BLOB_ROOT", global = true)]
    pub blob_root: Option<PathBuf>,

    /// Public base URL of filesystem-backed blobs
    #[arg(long, env = "SANCTUM_BLOB_PUBLIC_URL", global = true)]
    pub blob_public_url: Option<String>,

    /// Object store endpoint for the http blob backend
    #[arg(long, env = "SANCTUM_BLOB_ENDPOINT", global = true)]
    pub blob_endpoint: Option<String>,

    /// Write token for the http blob backend
    #[arg(long, env = "SANCTUM_BLOB_WRITE_TOKEN", hide_env_values = true, global = true)]
    pub blob_write_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Delete a user and everything it owns
    DeleteUser {
        /// Username to delete
        username: String,
    },
    /// Print a random token secret
    GenSecret,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            mode: self.mode,
            bind: self.bind.clone(),
            request_timeout_secs: self.request_timeout_secs,
            database_url: self.database_url.clone(),
            token_secret: self.token_secret.clone().map(Secret::new),
            blob_backend: self.blob_backend,
            blob_root: self.blob_root.clone(),
            blob_public_url: self.blob_public_url.clone(),
            blob_endpoint: self.blob_endpoint.clone(),
            blob_write_token: self.blob_write_token.clone().map(Secret::new),
        }
    }
}

/// 32 random bytes as 64 hex characters
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Construct the configured blob backend
pub async fn build_blob_store(settings: &Settings) -> Result<Arc<dyn BlobStore>> {
    let blob = &settings.blob;
    let store: Arc<dyn BlobStore> = match blob.backend {
        BlobBackend::Filesystem => Arc::new(
            FilesystemBlobStore::new(&blob.root, &blob.public_base_url)
                .await
                .with_context(|| format!("Failed to open blob root {}", blob.root.display()))?,
        ),
        BlobBackend::Http => {
            let endpoint = blob
                .endpoint
                .as_deref()
                .context("Blob endpoint is not configured")?;
            let token = blob.write_token.as_ref().map(|t| t.expose().to_string());
            Arc::new(HttpBlobStore::new(endpoint, token).context("Failed to build HTTP client")?)
        }
    };
    Ok(store)
}

/// Assemble the handler state from resolved settings and an open pool
pub async fn build_state(settings: &Settings, db: SqlitePool) -> Result<AppState> {
    let passwords =
        PasswordService::new(settings.hash_cost).context("Invalid password hash settings")?;
    let tokens = TokenService::new(settings.token_secret.expose().as_bytes());
    let blobs = build_blob_store(settings).await?;

    let mut state = AppState::new(db, tokens, passwords, blobs, settings.mode)
        .with_request_timeout(settings.request_timeout);
    if settings.blob.backend == BlobBackend::Filesystem {
        state = state.with_blob_files_root(settings.blob.root.clone());
    }
    Ok(state)
}
