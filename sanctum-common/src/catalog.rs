//! Built-in sound catalog
//!
//! Static list of the sounds shipped with the front-end. A section with no
//! saved configuration renders exactly this list.

use crate::models::{SectionSound, SectionType, SoundSource};

/// One built-in sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSound {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub file: &'static str,
}

const AMBIENT: &[BuiltinSound] = &[
    BuiltinSound { id: "city", name: "City", icon: "🏙️", file: "city.mp3" },
    BuiltinSound { id: "waves", name: "Waves", icon: "🌊", file: "waves.mp3" },
    BuiltinSound { id: "wind", name: "Wind", icon: "💨", file: "wind.mp3" },
    BuiltinSound { id: "fire", name: "Fire", icon: "🔥", file: "fire.m4a" },
    BuiltinSound { id: "forest", name: "Forest", icon: "🌲", file: "forest.mp3" },
    BuiltinSound { id: "rain", name: "Rain", icon: "🌧️", file: "rain.m4a" },
    BuiltinSound { id: "war", name: "War", icon: "⚔️", file: "war.mp3" },
];

const EFFECT: &[BuiltinSound] = &[
    BuiltinSound { id: "explosion", name: "Explosion", icon: "💥", file: "explosion.mp3" },
    BuiltinSound { id: "thunder", name: "Thunder", icon: "⚡", file: "thunder.mp3" },
    BuiltinSound { id: "wolf", name: "Wolf", icon: "🐺", file: "wolf.mp3" },
    BuiltinSound { id: "roar", name: "Roar", icon: "🦁", file: "roar.mp3" },
];

/// Default sounds for a section, in display order
pub fn defaults_for(section: SectionType) -> &'static [BuiltinSound] {
    match section {
        SectionType::Ambient => AMBIENT,
        SectionType::Effect => EFFECT,
    }
}

/// Look up a built-in sound by id within one section
pub fn find(section: SectionType, id: &str) -> Option<&'static BuiltinSound> {
    defaults_for(section).iter().find(|sound| sound.id == id)
}

/// Public path the front-end serves built-in files from
fn public_dir(section: SectionType) -> &'static str {
    match section {
        SectionType::Ambient => "/sounds/ambience",
        SectionType::Effect => "/sounds/effects",
    }
}

impl BuiltinSound {
    pub fn url(&self, section: SectionType) -> String {
        format!("{}/{}", public_dir(section), self.file)
    }

    pub fn to_section_sound(&self, section: SectionType) -> SectionSound {
        SectionSound {
            id: self.id.to_string(),
            name: self.name.to_string(),
            icon: self.icon.to_string(),
            url: self.url(section),
            file: Some(self.file.to_string()),
            source: SoundSource::Builtin,
        }
    }
}

/// Default list rendered as section sounds
pub fn default_sounds(section: SectionType) -> Vec<SectionSound> {
    defaults_for(section)
        .iter()
        .map(|sound| sound.to_section_sound(section))
        .collect()
}
