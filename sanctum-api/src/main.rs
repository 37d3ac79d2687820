//! sanctum-api - Ambience Sanctum HTTP service
//!
//! Serves authentication, track, environment, section and upload endpoints
//! over a SQLite database. See `sanctum-api --help` for subcommands.

use anyhow::{Context, Result};
use clap::Parser;
use sanctum_api::cli::{build_state, generate_secret, Cli, Command};
use sanctum_common::config::Settings;
use sanctum_common::db;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    if command == Command::GenSecret {
        println!("{}", generate_secret());
        return Ok(());
    }

    let settings = match Settings::load(cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing("info");
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&settings.log_level);

    if settings.token_secret_is_fallback {
        warn!("No token secret configured; using the development-only signing key");
    }

    match command {
        Command::Serve => serve(settings).await,
        Command::Migrate => migrate(&settings).await,
        Command::DeleteUser { username } => delete_user(&settings, &username).await,
        Command::GenSecret => Ok(()),
    }
}

async fn serve(settings: Settings) -> Result<()> {
    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Mode: {}", settings.mode);
    info!("Database: {}", settings.database_url);
    info!("Blob backend: {}", settings.blob.backend.as_str());

    let pool = db::init_database(&settings.database_url, settings.max_connections)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let state = build_state(&settings, pool.clone()).await?;
    let app = sanctum_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;
    info!("Listening on http://{}", settings.bind);
    info!("Health check: http://{}/health", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn migrate(settings: &Settings) -> Result<()> {
    let pool = db::connect(&settings.database_url, 1)
        .await
        .context("Failed to open database")?;
    db::run_migrations(&pool)
        .await
        .context("Migration failed")?;

    let version = db::current_schema_version(&pool).await?;
    info!("Database schema at v{}", version);
    pool.close().await;
    Ok(())
}

async fn delete_user(settings: &Settings, username: &str) -> Result<()> {
    let pool = db::init_database(&settings.database_url, 1)
        .await
        .context("Failed to initialize database")?;

    let user = sanctum_api::accounts::delete_user_by_username(&pool, username)
        .await
        .with_context(|| format!("Failed to delete user '{}'", username))?;
    println!("Deleted user {} ({})", user.username, user.id);

    pool.close().await;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
