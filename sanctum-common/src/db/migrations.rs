//! Database schema migrations
//!
//! Versioned, forward-only migrations tracked in the `schema_version` table.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change, bump
//!    [`CURRENT_SCHEMA_VERSION`]
//! 3. **Keep them idempotent** - `IF NOT EXISTS` everywhere so a partially
//!    applied run can be repeated

use crate::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest applied schema version (0 for a fresh database)
pub async fn current_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(tx: &mut Transaction<'_, Sqlite>, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Run all pending migrations
///
/// Each migration commits together with its version row, so a failure leaves
/// the database at the last fully applied version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = current_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Err(Error::Migration(format!(
            "database is at schema v{}, this build understands up to v{}",
            current_version, CURRENT_SCHEMA_VERSION
        )));
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        let mut tx = pool.begin().await?;
        migrate_v1(&mut tx).await?;
        set_schema_version(&mut tx, 1).await?;
        tx.commit().await?;
        info!("✓ Migration v1 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: initial schema
///
/// Users, tracks, environments and per-user section configuration.
/// Deleting a user cascades to everything it owns; deleting a track clears
/// any environment slot that pointed at it.
async fn migrate_v1(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    info!("Running migration v1: initial schema");

    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            filename TEXT NOT NULL,
            url TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('music', 'ambient', 'effect')),
            file_size INTEGER NOT NULL CHECK (file_size > 0),
            mime_type TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_tracks_user_created ON tracks(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_tracks_user_type ON tracks(user_id, type)",
        r#"
        CREATE TABLE IF NOT EXISTS environments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            combat_track_id TEXT REFERENCES tracks(id) ON DELETE SET NULL,
            exploration_track_id TEXT REFERENCES tracks(id) ON DELETE SET NULL,
            tension_track_id TEXT REFERENCES tracks(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_environments_user_created ON environments(user_id, created_at)",
        r#"
        CREATE TABLE IF NOT EXISTS section_configs (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            section_type TEXT NOT NULL CHECK (section_type IN ('ambient', 'effect')),
            sound_id TEXT NOT NULL,
            sound_source TEXT NOT NULL CHECK (sound_source IN ('builtin', 'uploaded')),
            display_order INTEGER NOT NULL CHECK (display_order >= 0),
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_section_configs_order
            ON section_configs(user_id, section_type, display_order)
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(&mut **tx).await?;
    }

    info!("  ✓ Created users, tracks, environments, section_configs");
    Ok(())
}
