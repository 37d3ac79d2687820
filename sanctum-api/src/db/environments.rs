//! Environment store
//!
//! An environment names up to three of the owner's tracks, one per
//! situation. Writes verify slot ownership inside the same transaction as the
//! insert/update so a rejected request never leaves a partial row.

use sanctum_common::models::{Environment, EnvironmentSlot, EnvironmentTracks, TrackRefs, TrackSummary};
use sanctum_common::time::{from_storage, now_string};
use sanctum_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::info;
use uuid::Uuid;

use super::{parse_uuid, placeholders};

const MAX_NAME_LEN: usize = 255;

const SELECT_ENVIRONMENT: &str = r#"
    SELECT e.id, e.user_id, e.name, e.created_at, e.updated_at,
           c.id AS combat_id, c.name AS combat_name, c.url AS combat_url,
           x.id AS exploration_id, x.name AS exploration_name, x.url AS exploration_url,
           t.id AS tension_id, t.name AS tension_name, t.url AS tension_url
    FROM environments e
    LEFT JOIN tracks c ON c.id = e.combat_track_id
    LEFT JOIN tracks x ON x.id = e.exploration_track_id
    LEFT JOIN tracks t ON t.id = e.tension_track_id
"#;

fn slot_summary(row: &SqliteRow, slot: EnvironmentSlot) -> Result<Option<TrackSummary>> {
    let prefix = slot.as_str();
    let id: Option<String> = row.get(format!("{}_id", prefix).as_str());

    match id {
        Some(id) => Ok(Some(TrackSummary {
            id: parse_uuid(&id)?,
            name: row.get(format!("{}_name", prefix).as_str()),
            url: row.get(format!("{}_url", prefix).as_str()),
        })),
        None => Ok(None),
    }
}

fn row_to_environment(row: &SqliteRow) -> Result<Environment> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Environment {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        name: row.get("name"),
        tracks: EnvironmentTracks {
            combat: slot_summary(row, EnvironmentSlot::Combat)?,
            exploration: slot_summary(row, EnvironmentSlot::Exploration)?,
            tension: slot_summary(row, EnvironmentSlot::Tension)?,
        },
        created_at: from_storage(&created_at)?,
        updated_at: from_storage(&updated_at)?,
    })
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Environment name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Environment name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Reject the request unless every non-null slot names one of the owner's tracks
async fn verify_track_ownership(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: Uuid,
    refs: &TrackRefs,
) -> Result<()> {
    let ids = refs.assigned();
    if ids.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT COUNT(*) FROM tracks WHERE user_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(owner_id.to_string());
    for id in &ids {
        query = query.bind(id.to_string());
    }
    let owned = query.fetch_one(&mut **tx).await?;

    if owned as usize != ids.len() {
        return Err(Error::InvalidInput(
            "Some track IDs are invalid or do not belong to you".to_string(),
        ));
    }
    Ok(())
}

fn slot_value(refs: &TrackRefs, slot: EnvironmentSlot) -> Option<String> {
    refs.get(slot).map(|id| id.to_string())
}

pub async fn create_environment(
    pool: &SqlitePool,
    owner_id: Uuid,
    name: &str,
    refs: TrackRefs,
) -> Result<Environment> {
    let name = normalize_name(name)?;
    let id = Uuid::new_v4();
    let now = now_string();

    let mut tx = pool.begin().await?;
    verify_track_ownership(&mut tx, owner_id, &refs).await?;

    sqlx::query(
        r#"
        INSERT INTO environments
            (id, user_id, name, combat_track_id, exploration_track_id, tension_track_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .bind(&name)
    .bind(slot_value(&refs, EnvironmentSlot::Combat))
    .bind(slot_value(&refs, EnvironmentSlot::Exploration))
    .bind(slot_value(&refs, EnvironmentSlot::Tension))
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(environment_id = %id, user_id = %owner_id, "Environment created");

    get_environment(pool, id, owner_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Environment {} vanished after insert", id)))
}

/// Owner's environments, newest first, with slot tracks resolved
pub async fn list_environments(pool: &SqlitePool, owner_id: Uuid) -> Result<Vec<Environment>> {
    let rows = sqlx::query(&format!(
        "{} WHERE e.user_id = ? ORDER BY e.created_at DESC, e.rowid DESC",
        SELECT_ENVIRONMENT
    ))
    .bind(owner_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_environment).collect()
}

pub async fn get_environment(
    pool: &SqlitePool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Environment>> {
    let row = sqlx::query(&format!(
        "{} WHERE e.id = ? AND e.user_id = ?",
        SELECT_ENVIRONMENT
    ))
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_environment).transpose()
}

/// Replace name and all three slots; an omitted slot is cleared
pub async fn update_environment(
    pool: &SqlitePool,
    id: Uuid,
    owner_id: Uuid,
    name: &str,
    refs: TrackRefs,
) -> Result<Environment> {
    let name = normalize_name(name)?;

    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM environments WHERE id = ? AND user_id = ?)",
    )
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .fetch_one(&mut *tx)
    .await?;
    if !exists {
        return Err(Error::NotFound("Environment not found".to_string()));
    }

    verify_track_ownership(&mut tx, owner_id, &refs).await?;

    sqlx::query(
        r#"
        UPDATE environments
        SET name = ?, combat_track_id = ?, exploration_track_id = ?, tension_track_id = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&name)
    .bind(slot_value(&refs, EnvironmentSlot::Combat))
    .bind(slot_value(&refs, EnvironmentSlot::Exploration))
    .bind(slot_value(&refs, EnvironmentSlot::Tension))
    .bind(now_string())
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(environment_id = %id, user_id = %owner_id, "Environment updated");

    get_environment(pool, id, owner_id)
        .await?
        .ok_or_else(|| Error::NotFound("Environment not found".to_string()))
}

pub async fn delete_environment(pool: &SqlitePool, id: Uuid, owner_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM environments WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Environment not found".to_string()));
    }

    info!(environment_id = %id, user_id = %owner_id, "Environment deleted");
    Ok(())
}
