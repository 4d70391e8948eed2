//! Archetype definitions — the three deck-building lanes and the
//! tag-to-archetype map feeding reward bias.

use gd_types::ids::{ArchetypeId, CardId, RelicId};
use serde::{Deserialize, Serialize};

/// Complete archetype definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeDefinition {
    pub id: ArchetypeId,
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    pub tags: Vec<Box<str>>,
    pub starter_cards: Vec<CardId>,
    pub starter_relics: Vec<RelicId>,
}

fn archetype(
    id: &str,
    tags: &[&str],
    starter_cards: &[&str],
    starter_relics: &[&str],
) -> ArchetypeDefinition {
    ArchetypeDefinition {
        id: ArchetypeId::from(id),
        name_key: format!("archetype.{id}.name").into(),
        desc_key: format!("archetype.{id}.desc").into(),
        tags: tags.iter().map(|t| Box::from(*t)).collect(),
        starter_cards: starter_cards.iter().map(|c| CardId::from(*c)).collect(),
        starter_relics: starter_relics.iter().map(|r| RelicId::from(*r)).collect(),
    }
}

/// The three archetypes, ordered by ID.
pub fn default_archetypes() -> Vec<ArchetypeDefinition> {
    let mut archetypes = vec![
        archetype(
            "debug_beatdown",
            &["debug", "offensive", "burn"],
            &["debug_strike", "stack_trace", "console_log", "strike", "strike", "defend"],
            &["git_init", "debugger"],
        ),
        archetype(
            "test_shrine",
            &["test", "defensive", "thorns"],
            &["test_guard", "integration_wall", "unit_bastion", "defend", "defend", "strike"],
            &["git_init", "test_framework"],
        ),
        archetype(
            "refactor_risk",
            &["refactor", "risk", "offensive"],
            &["refactor_strike", "spaghetti_whip", "quick_patch", "strike", "strike", "defend"],
            &["git_init", "legacy_code"],
        ),
    ];
    archetypes.sort_by(|a, b| a.id.cmp(&b.id));
    archetypes
}

/// Which archetype a content tag feeds when the player picks a reward
/// carrying it. Tags outside the map contribute nothing.
pub fn archetype_for_tag(tag: &str) -> Option<&'static str> {
    match tag {
        "debug" | "offensive" | "burn" => Some("debug_beatdown"),
        "test" | "defensive" | "thorns" => Some("test_shrine"),
        "refactor" | "risk" | "tech_debt" => Some("refactor_risk"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_archetypes_sorted() {
        let archetypes = default_archetypes();
        assert_eq!(archetypes.len(), 3);
        for pair in archetypes.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn starter_decks_are_six_cards() {
        for a in default_archetypes() {
            assert_eq!(a.starter_cards.len(), 6, "{}", a.id);
            assert_eq!(a.starter_relics.len(), 2, "{}", a.id);
        }
    }

    #[test]
    fn tag_map_reaches_each_archetype() {
        assert_eq!(archetype_for_tag("burn"), Some("debug_beatdown"));
        assert_eq!(archetype_for_tag("thorns"), Some("test_shrine"));
        assert_eq!(archetype_for_tag("tech_debt"), Some("refactor_risk"));
        assert_eq!(archetype_for_tag("basic"), None);
    }
}
