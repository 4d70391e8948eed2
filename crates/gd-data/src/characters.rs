//! Playable character definitions — base stat blocks and default
//! archetypes.

use gd_types::ids::{ArchetypeId, CharacterId};
use serde::{Deserialize, Serialize};

/// Base stat block of a character at level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: i32,
    pub mp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub critical: i32,
    pub evasion: i32,
    pub luck: i32,
}

/// Complete character definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDefinition {
    pub id: CharacterId,
    pub name_key: Box<str>,
    pub stats: BaseStats,
    pub archetype: ArchetypeId,
}

/// The default cast, ordered by ID.
pub fn default_characters() -> Vec<CharacterDefinition> {
    let mut characters = vec![
        CharacterDefinition {
            id: CharacterId::from("junior_dev"),
            name_key: "character.junior_dev.name".into(),
            stats: BaseStats {
                hp: 100,
                mp: 50,
                attack: 10,
                defense: 5,
                speed: 5,
                critical: 5,
                evasion: 2,
                luck: 2,
            },
            archetype: ArchetypeId::from("debug_beatdown"),
        },
        CharacterDefinition {
            id: CharacterId::from("release_engineer"),
            name_key: "character.release_engineer.name".into(),
            stats: BaseStats {
                hp: 110,
                mp: 40,
                attack: 8,
                defense: 7,
                speed: 4,
                critical: 3,
                evasion: 3,
                luck: 4,
            },
            archetype: ArchetypeId::from("test_shrine"),
        },
    ];
    characters.sort_by(|a, b| a.id.cmp(&b.id));
    characters
}

/// The character a fresh run starts with.
pub const DEFAULT_CHARACTER: &str = "junior_dev";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_character_exists() {
        assert!(default_characters().iter().any(|c| c.id.as_str() == DEFAULT_CHARACTER));
    }

    #[test]
    fn stats_are_positive_where_it_matters() {
        for c in default_characters() {
            assert!(c.stats.hp > 0);
            assert!(c.stats.attack > 0);
        }
    }
}
