//! Domain models
//!
//! Identifiers are UUID v4 everywhere (users, tracks, environments) and are
//! stored as lowercase hyphenated TEXT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Largest accepted upload, in bytes (50 MiB)
pub const MAX_TRACK_FILE_SIZE: i64 = 50 * 1024 * 1024;

/// MIME types accepted for uploaded tracks
pub const ALLOWED_AUDIO_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/ogg",
    "audio/m4a",
    "audio/aac",
    "audio/flac",
];

/// True when `mime_type` is on the audio allow-list
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_AUDIO_MIME_TYPES.contains(&mime_type)
}

// ========================================
// Users
// ========================================

/// Public view of a user account (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored user row including the password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

// ========================================
// Tracks
// ========================================

/// Category of an uploaded track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Music,
    Ambient,
    Effect,
}

impl TrackType {
    pub const ALL: [TrackType; 3] = [TrackType::Music, TrackType::Ambient, TrackType::Effect];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Music => "music",
            TrackType::Ambient => "ambient",
            TrackType::Effect => "effect",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "music" => Ok(TrackType::Music),
            "ambient" => Ok(TrackType::Ambient),
            "effect" => Ok(TrackType::Effect),
            _ => Err(Error::InvalidInput(
                "Type must be one of: music, ambient, effect".to_string(),
            )),
        }
    }
}

/// Uploaded-audio metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    pub file_size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata supplied when registering an already-stored blob as a track
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub track_type: TrackType,
    pub file_size: i64,
    pub mime_type: String,
}

/// Display-ready reference to a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

// ========================================
// Environments
// ========================================

/// The three situational slots of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentSlot {
    Combat,
    Exploration,
    Tension,
}

impl EnvironmentSlot {
    pub const ALL: [EnvironmentSlot; 3] = [
        EnvironmentSlot::Combat,
        EnvironmentSlot::Exploration,
        EnvironmentSlot::Tension,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentSlot::Combat => "combat",
            EnvironmentSlot::Exploration => "exploration",
            EnvironmentSlot::Tension => "tension",
        }
    }
}

/// Requested track assignment for each slot; `None` clears the slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackRefs {
    pub combat: Option<Uuid>,
    pub exploration: Option<Uuid>,
    pub tension: Option<Uuid>,
}

impl TrackRefs {
    pub fn get(&self, slot: EnvironmentSlot) -> Option<Uuid> {
        match slot {
            EnvironmentSlot::Combat => self.combat,
            EnvironmentSlot::Exploration => self.exploration,
            EnvironmentSlot::Tension => self.tension,
        }
    }

    /// Non-null references, deduplicated, in slot order
    pub fn assigned(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(3);
        for slot in EnvironmentSlot::ALL {
            if let Some(id) = self.get(slot) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Resolved track for each slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTracks {
    pub combat: Option<TrackSummary>,
    pub exploration: Option<TrackSummary>,
    pub tension: Option<TrackSummary>,
}

impl EnvironmentTracks {
    pub fn get(&self, slot: EnvironmentSlot) -> Option<&TrackSummary> {
        match slot {
            EnvironmentSlot::Combat => self.combat.as_ref(),
            EnvironmentSlot::Exploration => self.exploration.as_ref(),
            EnvironmentSlot::Tension => self.tension.as_ref(),
        }
    }
}

/// Named scenario bundling up to three tracks
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub tracks: EnvironmentTracks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ========================================
// Sections
// ========================================

/// The two customizable sound sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Ambient,
    Effect,
}

impl SectionType {
    pub const ALL: [SectionType; 2] = [SectionType::Ambient, SectionType::Effect];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Ambient => "ambient",
            SectionType::Effect => "effect",
        }
    }

    /// Icon shown for uploaded tracks placed in this section
    pub fn uploaded_icon(&self) -> &'static str {
        match self {
            SectionType::Ambient => "🎵",
            SectionType::Effect => "🔊",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ambient" => Ok(SectionType::Ambient),
            "effect" => Ok(SectionType::Effect),
            _ => Err(Error::InvalidInput("Invalid section type".to_string())),
        }
    }
}

/// Where a section entry's sound comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundSource {
    Builtin,
    Uploaded,
}

impl SoundSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundSource::Builtin => "builtin",
            SoundSource::Uploaded => "uploaded",
        }
    }
}

impl FromStr for SoundSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(SoundSource::Builtin),
            "uploaded" => Ok(SoundSource::Uploaded),
            other => Err(Error::InvalidInput(format!(
                "Sound source must be 'builtin' or 'uploaded', got '{}'",
                other
            ))),
        }
    }
}

/// One stored reference in a section configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub sound_id: String,
    pub source: SoundSource,
}

/// A sound as rendered to clients, either from the catalog or an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSound {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub source: SoundSource,
}

/// Resolved section configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SectionConfig {
    pub section: SectionType,
    pub sounds: Vec<SectionSound>,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_type_parse() {
        assert_eq!("music".parse::<TrackType>().unwrap(), TrackType::Music);
        assert_eq!("effect".parse::<TrackType>().unwrap(), TrackType::Effect);
        assert!("Music".parse::<TrackType>().is_err());
        assert!("podcast".parse::<TrackType>().is_err());
    }

    #[test]
    fn test_track_serializes_type_field() {
        let track = Track {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Battle".to_string(),
            filename: "battle.mp3".to_string(),
            url: "http://blobs/battle.mp3".to_string(),
            track_type: TrackType::Music,
            file_size: 1024,
            mime_type: "audio/mpeg".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["type"], "music");
        assert_eq!(json["file_size"], 1024);
    }

    #[test]
    fn test_mime_allow_list() {
        assert!(is_allowed_mime_type("audio/mpeg"));
        assert!(is_allowed_mime_type("audio/flac"));
        assert!(!is_allowed_mime_type("video/mp4"));
        assert!(!is_allowed_mime_type("AUDIO/MPEG"));
    }

    #[test]
    fn test_assigned_refs_deduplicated() {
        let shared = Uuid::new_v4();
        let refs = TrackRefs {
            combat: Some(shared),
            exploration: None,
            tension: Some(shared),
        };

        assert_eq!(refs.assigned(), vec![shared]);
        assert!(TrackRefs::default().assigned().is_empty());
    }

    #[test]
    fn test_section_and_source_parse() {
        assert_eq!("ambient".parse::<SectionType>().unwrap(), SectionType::Ambient);
        assert!("music".parse::<SectionType>().is_err());
        assert_eq!("uploaded".parse::<SoundSource>().unwrap(), SoundSource::Uploaded);
        assert!("remote".parse::<SoundSource>().is_err());
    }
}
