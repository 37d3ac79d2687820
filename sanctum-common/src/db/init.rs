//! Database initialization
//!
//! Every pooled connection gets the same pragmas: foreign keys enforced,
//! WAL journaling and a busy timeout, so concurrent writers queue instead of
//! failing immediately with `SQLITE_BUSY`.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool without touching the schema
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let filename = options.get_filename();
    let in_memory = filename.as_os_str().is_empty() || filename.to_string_lossy() == ":memory:";
    let newly_created = !in_memory && !filename.exists();

    if !in_memory {
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", database_url);
    } else {
        info!("Opened existing database: {}", database_url);
    }

    Ok(pool)
}

/// Open a pool and bring the schema up to date
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = connect(database_url, max_connections).await?;
    crate::db::migrations::run_migrations(&pool).await?;
    Ok(pool)
}
