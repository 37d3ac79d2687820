//! Section configuration store
//!
//! Each user may override the default sound list of the ambient and effect
//! sections. No rows for a section means "show the built-in defaults".

use sanctum_common::catalog;
use sanctum_common::models::{SectionConfig, SectionEntry, SectionSound, SectionType, SoundSource};
use sanctum_common::time::now_string;
use sanctum_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::placeholders;

/// Whether each section has a saved configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionSummary {
    pub ambient_configured: bool,
    pub effect_configured: bool,
}

impl SectionSummary {
    pub fn is_configured(&self, section: SectionType) -> bool {
        match section {
            SectionType::Ambient => self.ambient_configured,
            SectionType::Effect => self.effect_configured,
        }
    }
}

/// Saved entries for one section, in display order
pub async fn load_entries(
    pool: &SqlitePool,
    owner_id: Uuid,
    section: SectionType,
) -> Result<Vec<SectionEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT sound_id, sound_source FROM section_configs
        WHERE user_id = ? AND section_type = ?
        ORDER BY display_order ASC
        "#,
    )
    .bind(owner_id.to_string())
    .bind(section.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let source: String = row.get("sound_source");
            Ok(SectionEntry {
                sound_id: row.get("sound_id"),
                source: source.parse::<SoundSource>()?,
            })
        })
        .collect()
}

/// Resolve a section into displayable sounds
///
/// Built-in entries unknown to the catalog and uploaded entries whose track
/// is gone (or belongs to someone else) are skipped.
pub async fn get_section(
    pool: &SqlitePool,
    owner_id: Uuid,
    section: SectionType,
) -> Result<SectionConfig> {
    let entries = load_entries(pool, owner_id, section).await?;

    if entries.is_empty() {
        return Ok(SectionConfig {
            section,
            sounds: catalog::default_sounds(section),
            is_default: true,
        });
    }

    let uploaded_ids: Vec<Uuid> = entries
        .iter()
        .filter(|e| e.source == SoundSource::Uploaded)
        .filter_map(|e| Uuid::parse_str(&e.sound_id).ok())
        .collect();
    let uploaded = load_owned_tracks(pool, owner_id, &uploaded_ids).await?;

    let sounds = entries
        .iter()
        .filter_map(|entry| match entry.source {
            SoundSource::Builtin => {
                catalog::find(section, &entry.sound_id).map(|s| s.to_section_sound(section))
            }
            SoundSource::Uploaded => {
                let id = Uuid::parse_str(&entry.sound_id).ok()?;
                let (name, url) = uploaded.get(&id)?;
                Some(SectionSound {
                    id: id.to_string(),
                    name: name.clone(),
                    icon: section.uploaded_icon().to_string(),
                    url: url.clone(),
                    file: None,
                    source: SoundSource::Uploaded,
                })
            }
        })
        .collect();

    Ok(SectionConfig {
        section,
        sounds,
        is_default: false,
    })
}

async fn load_owned_tracks(
    pool: &SqlitePool,
    owner_id: Uuid,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, (String, String)>> {
    let mut tracks = HashMap::new();
    if ids.is_empty() {
        return Ok(tracks);
    }

    let sql = format!(
        "SELECT id, name, url FROM tracks WHERE user_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql).bind(owner_id.to_string());
    for id in ids {
        query = query.bind(id.to_string());
    }

    for row in query.fetch_all(pool).await? {
        let id: String = row.get("id");
        if let Ok(id) = Uuid::parse_str(&id) {
            tracks.insert(id, (row.get("name"), row.get("url")));
        }
    }
    Ok(tracks)
}

/// Replace a section's configuration wholesale
///
/// Runs delete + inserts in one transaction; `display_order` is the
/// position in `entries`. Returns the number of saved entries.
pub async fn save_section(
    pool: &SqlitePool,
    owner_id: Uuid,
    section: SectionType,
    entries: &[SectionEntry],
) -> Result<usize> {
    for entry in entries {
        if entry.sound_id.trim().is_empty() {
            return Err(Error::InvalidInput("Each sound must have an id".to_string()));
        }
    }

    let now = now_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM section_configs WHERE user_id = ? AND section_type = ?")
        .bind(owner_id.to_string())
        .bind(section.as_str())
        .execute(&mut *tx)
        .await?;

    for (order, entry) in entries.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO section_configs
                (user_id, section_type, sound_id, sound_source, display_order, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_id.to_string())
        .bind(section.as_str())
        .bind(entry.sound_id.trim())
        .bind(entry.source.as_str())
        .bind(order as i64)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(user_id = %owner_id, section = %section, count = entries.len(), "Section configuration saved");
    Ok(entries.len())
}

/// Drop a section's configuration so it falls back to the defaults
pub async fn reset_section(pool: &SqlitePool, owner_id: Uuid, section: SectionType) -> Result<()> {
    let result = sqlx::query("DELETE FROM section_configs WHERE user_id = ? AND section_type = ?")
        .bind(owner_id.to_string())
        .bind(section.as_str())
        .execute(pool)
        .await?;

    info!(
        user_id = %owner_id,
        section = %section,
        removed = result.rows_affected(),
        "Section configuration reset"
    );
    Ok(())
}

pub async fn section_summary(pool: &SqlitePool, owner_id: Uuid) -> Result<SectionSummary> {
    let rows = sqlx::query(
        "SELECT section_type, COUNT(*) AS entries FROM section_configs WHERE user_id = ? GROUP BY section_type",
    )
    .bind(owner_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut summary = SectionSummary::default();
    for row in rows {
        let section: String = row.get("section_type");
        let entries: i64 = row.get("entries");
        match section.parse::<SectionType>() {
            Ok(SectionType::Ambient) => summary.ambient_configured = entries > 0,
            Ok(SectionType::Effect) => summary.effect_configured = entries > 0,
            Err(_) => {}
        }
    }
    Ok(summary)
}
