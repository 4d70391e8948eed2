//! The content registry — immutable once built, shared read-only.
//!
//! Built by loading the default bundle, then overlaying content packs
//! in a deterministic order. A pack may add new IDs freely; it may
//! re-declare a base ID only when the definition is structurally
//! identical, otherwise the load fails naming the offending pack.

use std::collections::BTreeMap;

use gd_types::effect::EventOpcode;
use gd_types::enums::{ChapterType, CommitKind, ALL_CHAPTER_TYPES};
use gd_types::ids::{ArchetypeId, CardId, CharacterId, EnemyId, EventId, PackId, RelicId, StatusId};
use gd_types::{EngineError, StatusKind};
use serde::{Deserialize, Serialize};

use crate::archetypes::{default_archetypes, ArchetypeDefinition};
use crate::cards::{default_cards, CardDefinition};
use crate::chapters::{default_tuning, ChapterOverride, ChapterTuning};
use crate::characters::{default_characters, CharacterDefinition};
use crate::enemies::{default_enemies, enemy_id_for_kind, EnemyDefinition};
use crate::events::{default_events, EventDefinition};
use crate::relics::{default_relics, RelicDefinition};
use crate::statuses::{default_statuses, StatusDefinition};

// =============================================================================
// Registry
// =============================================================================

/// Immutable bundle of every content definition for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRegistry {
    pub cards: BTreeMap<CardId, CardDefinition>,
    pub relics: BTreeMap<RelicId, RelicDefinition>,
    pub statuses: BTreeMap<StatusId, StatusDefinition>,
    pub enemies: BTreeMap<EnemyId, EnemyDefinition>,
    pub events: BTreeMap<EventId, EventDefinition>,
    pub archetypes: BTreeMap<ArchetypeId, ArchetypeDefinition>,
    pub characters: BTreeMap<CharacterId, CharacterDefinition>,
    pub chapters: BTreeMap<ChapterType, ChapterTuning>,
    /// IDs of the loaded packs, sorted; part of the run fingerprint.
    pub pack_ids: Vec<PackId>,
}

impl ContentRegistry {
    pub fn card(&self, id: &CardId) -> Option<&CardDefinition> {
        self.cards.get(id)
    }

    pub fn relic(&self, id: &RelicId) -> Option<&RelicDefinition> {
        self.relics.get(id)
    }

    pub fn status(&self, id: &StatusId) -> Option<&StatusDefinition> {
        self.statuses.get(id)
    }

    pub fn enemy(&self, id: &EnemyId) -> Option<&EnemyDefinition> {
        self.enemies.get(id)
    }

    pub fn event(&self, id: &EventId) -> Option<&EventDefinition> {
        self.events.get(id)
    }

    pub fn archetype(&self, id: &ArchetypeId) -> Option<&ArchetypeDefinition> {
        self.archetypes.get(id)
    }

    pub fn character(&self, id: &CharacterId) -> Option<&CharacterDefinition> {
        self.characters.get(id)
    }

    /// Tuning for a chapter type (every type is present after build).
    pub fn chapter_tuning(&self, chapter_type: ChapterType) -> &ChapterTuning {
        &self.chapters[&chapter_type]
    }

    /// The enemy profile behind a commit kind.
    pub fn enemy_for_kind(&self, kind: CommitKind) -> Option<&EnemyDefinition> {
        self.enemies.get(&enemy_id_for_kind(kind))
    }

    pub fn cards_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a CardDefinition> {
        self.cards.values().filter(move |c| c.tags.iter().any(|t| t.as_ref() == tag))
    }
}

/// Build the registry with no packs.
pub fn build_default_registry() -> ContentRegistry {
    let registry = ContentRegistry {
        cards: default_cards().into_iter().map(|c| (c.id.clone(), c)).collect(),
        relics: default_relics().into_iter().map(|r| (r.id.clone(), r)).collect(),
        statuses: default_statuses().into_iter().map(|s| (s.id.clone(), s)).collect(),
        enemies: default_enemies().into_iter().map(|e| (e.id.clone(), e)).collect(),
        events: default_events().into_iter().map(|e| (e.id.clone(), e)).collect(),
        archetypes: default_archetypes().into_iter().map(|a| (a.id.clone(), a)).collect(),
        characters: default_characters().into_iter().map(|c| (c.id.clone(), c)).collect(),
        chapters: ALL_CHAPTER_TYPES.iter().map(|&ct| (ct, default_tuning(ct))).collect(),
        pack_ids: Vec::new(),
    };
    debug_assert!(validate(&registry).is_ok());
    registry
}

// =============================================================================
// Content packs
// =============================================================================

/// A parsed content pack, ready to overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPack {
    pub id: PackId,
    #[serde(default)]
    pub name_key: Box<str>,
    #[serde(default)]
    pub desc_key: Box<str>,
    #[serde(default)]
    pub cards: Vec<CardDefinition>,
    #[serde(default)]
    pub relics: Vec<RelicDefinition>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub chapter_overrides: BTreeMap<ChapterType, ChapterOverride>,
}

impl Default for ContentPack {
    fn default() -> Self {
        Self {
            id: PackId::from(""),
            name_key: Box::from(""),
            desc_key: Box::from(""),
            cards: Vec::new(),
            relics: Vec::new(),
            events: Vec::new(),
            chapter_overrides: BTreeMap::new(),
        }
    }
}

fn overlay<K: Ord + std::fmt::Display + Clone, V: PartialEq>(
    family: &str,
    base: &mut BTreeMap<K, V>,
    additions: Vec<(K, V)>,
    source: &str,
) -> Result<(), EngineError> {
    for (id, def) in additions {
        match base.get(&id) {
            Some(existing) if *existing != def => {
                return Err(EngineError::content(format!(
                    "pack '{source}' redeclares {family} '{id}' with a differing definition"
                )));
            }
            Some(_) => {}
            None => {
                base.insert(id, def);
            }
        }
    }
    Ok(())
}

/// Overlay packs onto a base registry, in the given order.
///
/// `packs` pairs each pack with the path it was loaded from, used in
/// conflict errors. The resulting `pack_ids` list is sorted.
pub fn merge_packs(
    mut base: ContentRegistry,
    packs: Vec<(ContentPack, Box<str>)>,
) -> Result<ContentRegistry, EngineError> {
    for (pack, source) in packs {
        if pack.id.as_str().is_empty() {
            return Err(EngineError::content(format!("pack '{source}' has an empty id")));
        }
        overlay(
            "card",
            &mut base.cards,
            pack.cards.into_iter().map(|c| (c.id.clone(), c)).collect(),
            &source,
        )?;
        overlay(
            "relic",
            &mut base.relics,
            pack.relics.into_iter().map(|r| (r.id.clone(), r)).collect(),
            &source,
        )?;
        overlay(
            "event",
            &mut base.events,
            pack.events.into_iter().map(|e| (e.id.clone(), e)).collect(),
            &source,
        )?;
        for (chapter_type, over) in &pack.chapter_overrides {
            if let Some(tuning) = base.chapters.get_mut(chapter_type) {
                tuning.apply(over);
            }
        }
        base.pack_ids.push(pack.id);
    }
    base.pack_ids.sort();
    base.pack_ids.dedup();
    validate(&base)?;
    Ok(base)
}

// =============================================================================
// Validation
// =============================================================================

/// Cross-reference every ID the registry mentions. Runs after pack
/// merge; failures abort startup.
pub fn validate(registry: &ContentRegistry) -> Result<(), EngineError> {
    for archetype in registry.archetypes.values() {
        for card in &archetype.starter_cards {
            if !registry.cards.contains_key(card) {
                return Err(EngineError::content(format!(
                    "archetype '{}' references unknown card '{card}'",
                    archetype.id
                )));
            }
        }
        for relic in &archetype.starter_relics {
            if !registry.relics.contains_key(relic) {
                return Err(EngineError::content(format!(
                    "archetype '{}' references unknown relic '{relic}'",
                    archetype.id
                )));
            }
        }
    }

    for character in registry.characters.values() {
        if !registry.archetypes.contains_key(&character.archetype) {
            return Err(EngineError::content(format!(
                "character '{}' references unknown archetype '{}'",
                character.id, character.archetype
            )));
        }
    }

    for card in registry.cards.values() {
        for effect in &card.effects {
            if let gd_types::effect::CardEffect::ApplyStatus { status, .. } = effect {
                if !registry.statuses.contains_key(status) {
                    return Err(EngineError::content(format!(
                        "card '{}' applies unknown status '{status}'",
                        card.id
                    )));
                }
            }
        }
    }

    for event in registry.events.values() {
        for choice in &event.choices {
            for op in &choice.effects {
                let missing = match op {
                    EventOpcode::AddCard { card }
                    | EventOpcode::RemoveCard { card }
                    | EventOpcode::UpgradeCard { card } => {
                        (!registry.cards.contains_key(card)).then(|| format!("card '{card}'"))
                    }
                    EventOpcode::AddRelic { relic } | EventOpcode::RemoveRelic { relic } => {
                        (!registry.relics.contains_key(relic)).then(|| format!("relic '{relic}'"))
                    }
                    EventOpcode::ApplyStatus { status, .. } => (!registry
                        .statuses
                        .contains_key(status))
                    .then(|| format!("status '{status}'")),
                    EventOpcode::ModifyBias { archetype, .. } => (!registry
                        .archetypes
                        .contains_key(archetype))
                    .then(|| format!("archetype '{archetype}'")),
                    _ => None,
                };
                if let Some(what) = missing {
                    return Err(EngineError::content(format!(
                        "event '{}' choice '{}' references unknown {what}",
                        event.id, choice.id
                    )));
                }
            }
        }
    }

    // Every commit kind must resolve to an enemy profile.
    for kind in [
        CommitKind::Feat,
        CommitKind::Fix,
        CommitKind::Docs,
        CommitKind::Refactor,
        CommitKind::Test,
        CommitKind::Chore,
        CommitKind::Merge,
        CommitKind::Revert,
        CommitKind::General,
    ] {
        if registry.enemy_for_kind(kind).is_none() {
            return Err(EngineError::content(format!("no enemy profile for commit kind {kind:?}")));
        }
    }

    // The stock status kinds must all be defined.
    for kind in [
        StatusKind::Vulnerable,
        StatusKind::Weak,
        StatusKind::Burn,
        StatusKind::Thorns,
        StatusKind::Charge,
        StatusKind::Focus,
        StatusKind::TechDebt,
        StatusKind::Bug,
    ] {
        if !registry.statuses.contains_key(&kind.id()) {
            return Err(EngineError::content(format!("missing status definition {kind:?}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinition;
    use gd_types::enums::{CardKind, CardRarity};

    fn pack(id: &str, cards: Vec<CardDefinition>) -> ContentPack {
        ContentPack { id: PackId::from(id), cards, ..Default::default() }
    }

    fn custom_card(id: &str, cost: u32) -> CardDefinition {
        CardDefinition {
            id: CardId::from(id),
            name_key: format!("card.{id}.name").into(),
            desc_key: format!("card.{id}.desc").into(),
            kind: CardKind::Skill,
            cost,
            rarity: CardRarity::Common,
            effects: vec![gd_types::effect::CardEffect::Draw { count: 1 }],
            tags: vec![],
        }
    }

    #[test]
    fn default_registry_validates() {
        let registry = build_default_registry();
        assert!(validate(&registry).is_ok());
        assert!(registry.pack_ids.is_empty());
    }

    #[test]
    fn packs_add_new_ids() {
        let base = build_default_registry();
        let merged = merge_packs(
            base,
            vec![(pack("extras", vec![custom_card("peer_review", 1)]), "packs/extras".into())],
        )
        .unwrap();
        assert!(merged.cards.contains_key(&CardId::from("peer_review")));
        assert_eq!(merged.pack_ids, vec![PackId::from("extras")]);
    }

    #[test]
    fn identical_redeclaration_is_tolerated() {
        let base = build_default_registry();
        let existing = base.cards.get(&CardId::from("strike")).unwrap().clone();
        let merged =
            merge_packs(base, vec![(pack("dup", vec![existing]), "packs/dup".into())]).unwrap();
        assert!(merged.cards.contains_key(&CardId::from("strike")));
    }

    #[test]
    fn differing_redeclaration_is_rejected_with_source() {
        let base = build_default_registry();
        let mut changed = base.cards.get(&CardId::from("strike")).unwrap().clone();
        changed.cost = 0;
        let err =
            merge_packs(base, vec![(pack("bad", vec![changed]), "packs/bad".into())]).unwrap_err();
        assert!(err.message.contains("packs/bad"));
        assert!(err.message.contains("strike"));
    }

    #[test]
    fn pack_ids_sort_regardless_of_load_order() {
        let base = build_default_registry();
        let merged = merge_packs(
            base,
            vec![
                (pack("zeta", vec![custom_card("z_card", 1)]), "packs/zeta".into()),
                (pack("alpha", vec![custom_card("a_card", 1)]), "packs/alpha".into()),
            ],
        )
        .unwrap();
        assert_eq!(merged.pack_ids, vec![PackId::from("alpha"), PackId::from("zeta")]);
    }

    #[test]
    fn chapter_overrides_merge() {
        let base = build_default_registry();
        let mut p = pack("tweak", vec![]);
        p.chapter_overrides.insert(
            ChapterType::Feature,
            ChapterOverride { boss_chance: Some(0.8), ..Default::default() },
        );
        let merged = merge_packs(base, vec![(p, "packs/tweak".into())]).unwrap();
        assert!((merged.chapter_tuning(ChapterType::Feature).boss_chance - 0.8).abs() < 1e-12);
    }

    #[test]
    fn validation_catches_dangling_event_references() {
        let mut registry = build_default_registry();
        let mut bad_event = registry.events.values().next().unwrap().clone();
        bad_event.id = EventId::from("bad_event");
        bad_event.choices[0]
            .effects
            .push(EventOpcode::AddCard { card: CardId::from("no_such_card") });
        registry.events.insert(bad_event.id.clone(), bad_event);
        assert!(validate(&registry).is_err());
    }
}
