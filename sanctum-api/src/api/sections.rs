//! Section configuration endpoints
//!
//! - `GET /sections` summarizes both sections and returns the defaults
//! - `GET /sections?section=ambient|effect` returns the resolved sound list
//! - `POST /sections` saves `{sectionType, sounds: [{id, source}]}`
//! - `DELETE /sections?section=` resets a section to the defaults

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use sanctum_common::catalog;
use sanctum_common::models::{SectionEntry, SectionType, SoundSource};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{method_not_allowed, AuthUser};
use crate::db::sections;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SectionQuery {
    pub section: Option<String>,
}

/// Body of `POST /sections`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSectionRequest {
    pub section_type: Option<String>,
    #[serde(default)]
    pub sounds: Value,
}

fn invalid_section() -> ApiError {
    ApiError::BadRequest("Invalid section type".to_string())
}

fn parse_section(raw: Option<&str>) -> ApiResult<SectionType> {
    raw.and_then(|s| s.parse::<SectionType>().ok())
        .ok_or_else(invalid_section)
}

/// One element of the `sounds` array
#[derive(Debug, Deserialize)]
pub struct SoundRequest {
    pub id: SoundId,
    pub source: SoundSource,
}

/// Sound ids are strings; numeric ids from older clients are stringified
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SoundId {
    Text(String),
    Number(serde_json::Number),
}

impl SoundRequest {
    fn into_entry(self, index: usize) -> ApiResult<SectionEntry> {
        let sound_id = match self.id {
            SoundId::Text(s) => s.trim().to_string(),
            SoundId::Number(n) => n.to_string(),
        };
        if sound_id.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Sound at position {} is missing an id",
                index
            )));
        }

        Ok(SectionEntry {
            sound_id,
            source: self.source,
        })
    }
}

/// Validate the `sounds` array into ordered entries
fn parse_sounds(sounds: &Value) -> ApiResult<Vec<SectionEntry>> {
    let items = sounds
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("Sounds must be an array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            SoundRequest::deserialize(item)
                .map_err(|_| {
                    ApiError::BadRequest(format!(
                        "Sound at position {} must have an id and source 'builtin' or 'uploaded'",
                        index
                    ))
                })?
                .into_entry(index)
        })
        .collect()
}

fn defaults_json() -> Value {
    let mut defaults = serde_json::Map::new();
    for section in SectionType::ALL {
        defaults.insert(
            section.as_str().to_string(),
            json!(catalog::default_sounds(section)),
        );
    }
    Value::Object(defaults)
}

/// GET /sections
pub async fn get_sections(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<SectionQuery>,
) -> ApiResult<Json<Value>> {
    // A missing or unrecognized section falls through to the summary
    if let Some(section) = query.section.as_deref().and_then(|s| s.parse::<SectionType>().ok()) {
        let config = sections::get_section(&state.db, user.id, section).await?;
        return Ok(Json(json!({
            "success": true,
            "section": config.section,
            "sounds": config.sounds,
            "isDefault": config.is_default,
        })));
    }

    let summary = sections::section_summary(&state.db, user.id).await?;
    let status = |section: SectionType| {
        if summary.is_configured(section) {
            "configured"
        } else {
            "default"
        }
    };

    Ok(Json(json!({
        "success": true,
        "sections": {
            "ambient": status(SectionType::Ambient),
            "effect": status(SectionType::Effect),
        },
        "defaults": defaults_json(),
    })))
}

/// POST /sections
pub async fn save_section(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SaveSectionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let section = parse_section(request.section_type.as_deref())?;
    let entries = parse_sounds(&request.sounds)?;

    let count = sections::save_section(&state.db, user.id, section, &entries).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} section configuration saved", section),
        "section": section,
        "soundCount": count,
    })))
}

/// DELETE /sections?section=
pub async fn reset_section(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<SectionQuery>,
) -> ApiResult<Json<Value>> {
    let section = parse_section(query.section.as_deref())?;

    sections::reset_section(&state.db, user.id, section).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} section reset to default", section),
        "section": section,
        "defaultSounds": catalog::default_sounds(section),
    })))
}

/// Build section routes
pub fn section_routes() -> Router<AppState> {
    Router::new().route(
        "/sections",
        get(get_sections)
            .post(save_section)
            .delete(reset_section)
            .fallback(method_not_allowed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sounds() {
        let entries = parse_sounds(&json!([
            { "id": "rain", "source": "builtin" },
            { "id": "0b9f1c3e-2f7a-4f43-9d4e-3f1d2b8c9a10", "source": "uploaded" },
        ]))
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sound_id, "rain");
        assert_eq!(entries[1].source, SoundSource::Uploaded);
    }

    #[test]
    fn test_parse_sounds_rejects_bad_shapes() {
        assert!(parse_sounds(&json!({ "id": "rain" })).is_err());
        assert!(parse_sounds(&Value::Null).is_err());
        assert!(parse_sounds(&json!([{ "source": "builtin" }])).is_err());
        assert!(parse_sounds(&json!([{ "id": "rain", "source": "remote" }])).is_err());
        assert!(parse_sounds(&json!([{ "id": "  ", "source": "builtin" }])).is_err());
    }

    #[test]
    fn test_parse_sounds_messages_name_position() {
        let err = parse_sounds(&json!([
            { "id": "rain", "source": "builtin" },
            { "id": "wind", "source": "remote" },
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("position 1"));

        let err = parse_sounds(&json!([{ "id": "", "source": "builtin" }])).unwrap_err();
        assert_eq!(err.to_string(), "Sound at position 0 is missing an id");
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        let entries = parse_sounds(&json!([{ "id": 42, "source": "builtin" }])).unwrap();
        assert_eq!(entries[0].sound_id, "42");
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(parse_sounds(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_defaults_json_has_both_sections() {
        let defaults = defaults_json();
        assert_eq!(defaults["ambient"].as_array().unwrap().len(), 7);
        assert_eq!(defaults["effect"].as_array().unwrap().len(), 4);
    }
}
