//! Game state structures — the run-owned tree mutated only through the
//! action pipeline.
//!
//! Every map is a `BTreeMap` and every list has a stable order, so a
//! serialised state is byte-deterministic. Status lists are `Vec`s
//! because application order is part of the rules (on-turn-start
//! effects fire in insertion order).

use std::collections::BTreeMap;

use arrayvec::ArrayVec;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::commit::CommitRecord;
use crate::effect::Intent;
use crate::enums::*;
use crate::ids::*;
use crate::rng::RngState;

// =============================================================================
// Capacity constants
// =============================================================================

/// Current save document schema version.
pub const SAVE_SCHEMA_VERSION: u32 = 2;
/// Max cards in hand during battle.
pub const MAX_HAND: usize = 10;
/// Cards drawn at the start of each player turn.
pub const STARTING_HAND_SIZE: usize = 5;
/// Character base energy per turn before relics and statuses.
pub const BASE_ENERGY: u32 = 3;
/// Effective max energy never drops below this, whatever tech_debt says.
pub const MIN_MAX_ENERGY: u32 = 1;
/// Default escape probability for non-boss encounters.
pub const DEFAULT_ESCAPE_PROBABILITY: f64 = 0.7;
/// Reward bundles offer this many card choices.
pub const REWARD_CARD_CHOICES: usize = 3;

// =============================================================================
// Packed boolean flags
// =============================================================================

bitflags! {
    /// Boolean player state packed into a u32 bitfield.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PlayerFlags: u32 {
        /// Block survives the owner's turn start (granted by relics).
        const RETAIN_BLOCK = 1 << 0;
        /// The player braced this enemy turn (defend action).
        const DEFENDING = 1 << 1;
    }
}

bitflags! {
    /// Per-card-instance flags packed into a u32 bitfield.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CardFlags: u32 {
        /// Goes to the exhaust pile when played.
        const EXHAUST = 1 << 0;
        /// Granted mid-run rather than part of the starter deck.
        const ACQUIRED = 1 << 1;
    }
}

// Manual serde for the bitflag types as plain u32 values.
macro_rules! serde_bitflags {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.bits().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let bits = u32::deserialize(deserializer)?;
                Ok($name::from_bits_truncate(bits))
            }
        }
    };
}

serde_bitflags!(PlayerFlags);
serde_bitflags!(CardFlags);

// =============================================================================
// Stats and character
// =============================================================================

/// One stat: a base value plus a run-scoped modifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub base: i32,
    pub modifier: i32,
}

impl Stat {
    pub fn new(base: i32) -> Self {
        Self { base, modifier: 0 }
    }

    /// Effective value, never negative.
    pub fn value(&self) -> i32 {
        (self.base + self.modifier).max(0)
    }
}

/// The eight-stat block shared by the player and (conceptually) enemies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSet {
    pub hp: Stat,
    pub mp: Stat,
    pub attack: Stat,
    pub defense: Stat,
    pub speed: Stat,
    pub critical: Stat,
    pub evasion: Stat,
    pub luck: Stat,
}

impl StatSet {
    pub fn get(&self, kind: StatKind) -> &Stat {
        match kind {
            StatKind::Hp => &self.hp,
            StatKind::Mp => &self.mp,
            StatKind::Attack => &self.attack,
            StatKind::Defense => &self.defense,
            StatKind::Speed => &self.speed,
            StatKind::Critical => &self.critical,
            StatKind::Evasion => &self.evasion,
            StatKind::Luck => &self.luck,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut Stat {
        match kind {
            StatKind::Hp => &mut self.hp,
            StatKind::Mp => &mut self.mp,
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::Speed => &mut self.speed,
            StatKind::Critical => &mut self.critical,
            StatKind::Evasion => &mut self.evasion,
            StatKind::Luck => &mut self.luck,
        }
    }
}

/// One stack of a status effect. `remaining_turns: None` means
/// indefinite duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStack {
    pub id: StatusId,
    pub stacks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_turns: Option<u32>,
}

/// The player character: level, resources, stats, and statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub character: CharacterId,
    pub level: u32,
    pub current_hp: u32,
    pub current_mp: u32,
    pub experience: u32,
    pub stats: StatSet,
    /// In-battle block; absorbed before HP, reset at turn start.
    pub block: u32,
    /// Insertion order is the rules order for on-turn-start ticks.
    pub statuses: Vec<StatusStack>,
}

impl CharacterState {
    pub fn max_hp(&self) -> u32 {
        self.stats.hp.value().max(0) as u32
    }

    pub fn max_mp(&self) -> u32 {
        self.stats.mp.value().max(0) as u32
    }

    pub fn is_dead(&self) -> bool {
        self.current_hp == 0
    }

    /// Experience needed to reach the next level: `level^2 * 100`.
    pub fn experience_to_next(&self) -> u32 {
        self.level * self.level * 100
    }

    /// Heal up to max HP; returns the amount actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(self.max_hp() - self.current_hp);
        self.current_hp += healed;
        healed
    }

    /// Damage HP directly (block is handled by combat resolution).
    /// Returns the amount actually lost.
    pub fn lose_hp(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.current_hp);
        self.current_hp -= lost;
        lost
    }

    pub fn status_stacks(&self, id: &StatusId) -> u32 {
        self.statuses.iter().find(|s| &s.id == id).map_or(0, |s| s.stacks)
    }
}

// =============================================================================
// Deck and energy
// =============================================================================

/// One card in the run deck or a battle pile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub card: CardId,
    #[serde(default)]
    pub upgrade: u8,
    #[serde(default)]
    pub flags: CardFlags,
}

impl CardInstance {
    pub fn new(card: impl Into<CardId>) -> Self {
        Self { card: card.into(), upgrade: 0, flags: CardFlags::empty() }
    }
}

/// The four battle piles. Total card count is conserved within a battle
/// except for explicit add/remove effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckState {
    pub draw: Vec<CardInstance>,
    pub hand: ArrayVec<CardInstance, MAX_HAND>,
    pub discard: Vec<CardInstance>,
    pub exhaust: Vec<CardInstance>,
}

impl DeckState {
    pub fn total_cards(&self) -> usize {
        self.draw.len() + self.hand.len() + self.discard.len() + self.exhaust.len()
    }
}

/// Per-turn energy. `current` may exceed `max` mid-turn: gains are not
/// capped unless a status says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyState {
    pub max: u32,
    pub current: u32,
    pub gained_this_turn: u32,
}

impl EnergyState {
    pub fn new(max: u32) -> Self {
        Self { max, current: max, gained_this_turn: 0 }
    }
}

// =============================================================================
// Archetype bias
// =============================================================================

/// Per-archetype scalars accumulated from the player's reward picks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeBias {
    pub debug: f64,
    pub test: f64,
    pub refactor: f64,
    /// Raw tag counts behind the weights, for inspection and saves.
    #[serde(default)]
    pub tag_counts: BTreeMap<Box<str>, u32>,
}

impl ArchetypeBias {
    /// Normalised weights as (debug, test, refactor). Uniform when no
    /// picks were recorded; otherwise each share is floored at 0.1.
    pub fn normalized(&self) -> (f64, f64, f64) {
        let total = self.debug + self.test + self.refactor;
        if total <= 0.0 {
            return (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);
        }
        (
            (self.debug / total).max(0.1),
            (self.test / total).max(0.1),
            (self.refactor / total).max(0.1),
        )
    }

    /// The archetype with the highest weight, as a stable ID.
    pub fn dominant(&self) -> ArchetypeId {
        let (debug, test, refactor) = self.normalized();
        if test > debug && test >= refactor {
            ArchetypeId::from("test_shrine")
        } else if refactor > debug {
            ArchetypeId::from("refactor_risk")
        } else {
            ArchetypeId::from("debug_beatdown")
        }
    }
}

// =============================================================================
// Player
// =============================================================================

/// Full player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub character: CharacterState,
    pub gold: u32,
    pub relics: Vec<RelicId>,
    /// The run deck; battle piles are rebuilt from it on battle entry.
    pub deck: Vec<CardInstance>,
    pub energy: EnergyState,
    pub bias: ArchetypeBias,
    pub archetype: ArchetypeId,
    pub flags: PlayerFlags,
}

// =============================================================================
// Enemies and encounters
// =============================================================================

/// The enemy of the current battle, parameterised from a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: EnemyId,
    pub name: Box<str>,
    pub kind: CommitKind,
    pub commit_hash: Box<str>,
    pub current_hp: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub block: u32,
    pub statuses: Vec<StatusStack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub gold_reward: u32,
    pub exp_reward: u32,
    pub is_boss: bool,
}

impl EnemyState {
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    pub fn status_stacks(&self, id: &StatusId) -> u32 {
        self.statuses.iter().find(|s| &s.id == id).map_or(0, |s| s.stacks)
    }
}

/// Active battle sub-state, created on combat start and destroyed on
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub enemy: EnemyState,
    pub deck: DeckState,
    pub turn: u32,
    pub phase: TurnPhase,
    pub escape_probability: f64,
    pub chapter_index: u32,
    pub node_position: u32,
    /// The battle-combat stream, re-derived each turn.
    pub rng: RngState,
}

/// One shop offer. Costs scale with chapter depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub id: Box<str>,
    pub label: Box<str>,
    pub cost: u32,
    #[serde(default)]
    pub heal: u32,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub mp_restore: u32,
    #[serde(default)]
    pub max_hp_bonus: u32,
}

/// Shop sub-state awaiting buy/skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEncounter {
    pub offers: Vec<ShopOffer>,
    pub purchased: Vec<Box<str>>,
}

/// Event sub-state awaiting a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEncounter {
    pub event: EventId,
}

/// The current encounter — at most one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encounter {
    Battle(Box<BattleState>),
    Event(EventEncounter),
    Shop(ShopEncounter),
    Rest,
}

/// A post-battle reward bundle awaiting exactly one pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub card_choices: Vec<CardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relic: Option<RelicId>,
    pub heal: u32,
}

// =============================================================================
// Route and chapters
// =============================================================================

/// Typed position in a chapter's route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: u32,
    #[serde(default)]
    pub tags: Vec<NodeTag>,
    /// Chapter-local index of the commit parameterising a combat node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_index: Option<u32>,
}

/// Per-run route state for the current chapter, plus cross-chapter
/// materialisation and event flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteState {
    pub nodes: Vec<RouteNode>,
    /// Position of the node being resolved; `None` before the first
    /// advance in a chapter.
    pub cursor: Option<u32>,
    pub visited: Vec<NodeId>,
    /// Flags written by event `set_flag` opcodes.
    pub flags: BTreeMap<Box<str>, Box<str>>,
    /// A `trigger_battle` opcode arms this; the next advance honours it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_battle: Option<Box<str>>,
    /// Node-kind sequences of every generated chapter route, keyed by
    /// chapter ID. Part of the replay surface.
    pub materialised: BTreeMap<Box<str>, Vec<NodeKind>>,
}

/// One chapter: an ordered reference to a contiguous commit slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterState {
    pub id: ChapterId,
    pub index: u32,
    pub chapter_type: ChapterType,
    /// Offset of the chapter's first commit in the run's commit list.
    pub start_index: u32,
    pub commit_count: u32,
    pub enemies_defeated: u32,
    pub completed: bool,
    pub has_boss: bool,
}

// =============================================================================
// GameState — the root
// =============================================================================

/// Full game state. Created at run start, mutated only through
/// `Engine::apply`, serialised on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub run_id: Box<str>,
    pub seed: u32,
    pub schema_version: u32,
    pub repo_fingerprint: Box<str>,
    pub mutator: Mutator,
    pub difficulty: Box<str>,

    pub player: PlayerState,

    // Commit material the run was built from
    pub commits: Vec<CommitRecord>,
    pub total_commits: u32,

    // Chapter progression
    pub chapters: Vec<ChapterState>,
    pub current_chapter: u32,
    pub commit_cursor: u32,

    // Encounter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Encounter>,
    pub in_combat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reward: Option<RewardState>,

    // Bookkeeping
    pub enemies_defeated: Vec<Box<str>>,
    pub chapters_completed: Vec<ChapterId>,
    pub route: RouteState,

    pub is_game_over: bool,
    pub is_victory: bool,

    // Event stream counter
    pub next_event_id: u64,

    // Root RNG record; gameplay streams derive from `seed`
    pub rng: RngState,

    // Content surface identity
    pub pack_ids: Vec<PackId>,
}

impl GameState {
    /// The chapter currently being traversed, if any remain.
    pub fn chapter(&self) -> Option<&ChapterState> {
        self.chapters.get(self.current_chapter as usize)
    }

    pub fn chapter_mut(&mut self) -> Option<&mut ChapterState> {
        self.chapters.get_mut(self.current_chapter as usize)
    }

    /// The active battle, if the encounter is one.
    pub fn battle(&self) -> Option<&BattleState> {
        match &self.encounter {
            Some(Encounter::Battle(b)) => Some(b),
            _ => None,
        }
    }

    pub fn battle_mut(&mut self) -> Option<&mut BattleState> {
        match &mut self.encounter {
            Some(Encounter::Battle(b)) => Some(b),
            _ => None,
        }
    }

    /// Battle turn number, 0 outside combat.
    pub fn turn(&self) -> u32 {
        self.battle().map_or(0, |b| b.turn)
    }

    /// Battle phase; `Resolution` outside combat.
    pub fn phase(&self) -> TurnPhase {
        self.battle().map_or(TurnPhase::Resolution, |b| b.phase)
    }

    /// The node under the cursor, if the chapter route has begun.
    pub fn current_node(&self) -> Option<&RouteNode> {
        let cursor = self.route.cursor?;
        self.route.nodes.get(cursor as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_value_never_negative() {
        let stat = Stat { base: 3, modifier: -10 };
        assert_eq!(stat.value(), 0);
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut character = CharacterState {
            character: CharacterId::from("junior_dev"),
            level: 1,
            current_hp: 90,
            current_mp: 0,
            experience: 0,
            stats: StatSet { hp: Stat::new(100), ..StatSet::default() },
            block: 0,
            statuses: Vec::new(),
        };
        assert_eq!(character.heal(30), 10);
        assert_eq!(character.current_hp, 100);
    }

    #[test]
    fn lose_hp_stops_at_zero() {
        let mut character = CharacterState {
            character: CharacterId::from("junior_dev"),
            level: 1,
            current_hp: 5,
            current_mp: 0,
            experience: 0,
            stats: StatSet { hp: Stat::new(100), ..StatSet::default() },
            block: 0,
            statuses: Vec::new(),
        };
        assert_eq!(character.lose_hp(12), 5);
        assert!(character.is_dead());
    }

    #[test]
    fn experience_curve_is_quadratic() {
        let mut character = CharacterState {
            character: CharacterId::from("junior_dev"),
            level: 3,
            current_hp: 1,
            current_mp: 0,
            experience: 0,
            stats: StatSet::default(),
            block: 0,
            statuses: Vec::new(),
        };
        assert_eq!(character.experience_to_next(), 900);
        character.level = 1;
        assert_eq!(character.experience_to_next(), 100);
    }

    #[test]
    fn bias_uniform_when_empty() {
        let bias = ArchetypeBias::default();
        let (d, t, r) = bias.normalized();
        assert!((d - 1.0 / 3.0).abs() < 1e-12);
        assert!((t - 1.0 / 3.0).abs() < 1e-12);
        assert!((r - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn bias_dominant_tracks_weights() {
        let bias = ArchetypeBias { test: 0.5, debug: 0.2, refactor: 0.1, ..Default::default() };
        assert_eq!(bias.dominant().as_str(), "test_shrine");
    }

    #[test]
    fn deck_total_spans_all_piles() {
        let mut deck = DeckState::default();
        deck.draw.push(CardInstance::new("strike"));
        deck.discard.push(CardInstance::new("defend"));
        deck.exhaust.push(CardInstance::new("quick_patch"));
        deck.hand.push(CardInstance::new("strike"));
        assert_eq!(deck.total_cards(), 4);
    }

    #[test]
    fn player_flags_round_trip_as_u32() {
        let flags = PlayerFlags::RETAIN_BLOCK | PlayerFlags::DEFENDING;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "3");
        let back: PlayerFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
