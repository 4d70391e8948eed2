//! All enum types for the Git Dungeon engine.
//!
//! Each enum uses `#[serde(rename_all = "snake_case")]` so the save
//! format and content packs use the same string constants everywhere.

use serde::{Deserialize, Serialize};

// =============================================================================
// Chapters and commits
// =============================================================================

/// Chapter region types derived from the commit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterType {
    Initial,
    Feature,
    Fix,
    Integration,
    Legacy,
}

/// All chapter types as a const array, in canonical order.
pub const ALL_CHAPTER_TYPES: [ChapterType; 5] = [
    ChapterType::Initial,
    ChapterType::Feature,
    ChapterType::Fix,
    ChapterType::Integration,
    ChapterType::Legacy,
];

impl ChapterType {
    pub fn key(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Integration => "integration",
            Self::Legacy => "legacy",
        }
    }
}

/// Commit classification driving enemy stats and reward modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    Feat,
    Fix,
    Docs,
    Refactor,
    Test,
    Chore,
    Merge,
    Revert,
    /// Unclassified messages; uses the feat stat profile.
    General,
}

// =============================================================================
// Route nodes
// =============================================================================

/// Node kinds within a chapter route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Battle,
    Elite,
    Boss,
    Event,
    Shop,
    Rest,
    Treasure,
}

impl NodeKind {
    /// Whether entering this node spawns an enemy.
    pub fn is_combat(self) -> bool {
        matches!(self, Self::Battle | Self::Elite | Self::Boss)
    }
}

/// Flavor tags attached to route nodes; event selection prefers
/// events sharing a tag with the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Risk,
    Safe,
    Greed,
    Milestone,
}

// =============================================================================
// Combat
// =============================================================================

/// Battle turn phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Player,
    Enemy,
    Resolution,
}

/// Enemy intent kinds, declared before the player acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Attack,
    Defend,
    Buff,
    Debuff,
    Charge,
    Escape,
}

/// Enemy intent-selection behaviours. The enemy definition's
/// `intent_preference` list is authoritative; the pattern shapes how
/// it is sampled: `basic` uniform, `aggressive` weights attack entries
/// 3x, `defensive` weights defend entries 3x, `cyclic` walks the list
/// by turn index without consuming RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiPattern {
    Basic,
    Aggressive,
    Defensive,
    Cyclic,
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    Defeat,
    Escaped,
    EnemyFled,
}

/// Damage channels. True damage ignores defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Physical,
    True,
}

// =============================================================================
// Statuses
// =============================================================================

/// Built-in status behaviours. Stack meanings:
/// - `vulnerable`: +25% damage taken per stack
/// - `weak`: attacks deal -25% per stack
/// - `burn`: N damage per stack at owner's turn end, then one stack decays
/// - `thorns`: reflects N per stack to each attacker
/// - `charge`: +N energy at next turn start, then clears
/// - `focus`: +1 card drawn at turn start per stack
/// - `tech_debt`: -1 effective max energy per stack (floor 1)
/// - `bug`: 1 damage and -1 drawn card per stack at turn start (draw floor 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Vulnerable,
    Weak,
    Burn,
    Thorns,
    Charge,
    Focus,
    TechDebt,
    Bug,
}

// =============================================================================
// Content
// =============================================================================

/// Card categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Attack,
    Skill,
    Power,
}

/// Card rarities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardRarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// Relic tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelicTier {
    Starter,
    Common,
    Uncommon,
    Rare,
    Boss,
}

/// The hook points a relic effect can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelicHook {
    OnTurnStart,
    OnDamageTaken,
    OnCardPlayed,
    OnReward,
    Passive,
}

/// Character stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Hp,
    Mp,
    Attack,
    Defense,
    Speed,
    Critical,
    Evasion,
    Luck,
}

// =============================================================================
// Run configuration
// =============================================================================

/// Named difficulty presets scaling enemies up and rewards down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutator {
    #[default]
    None,
    Hard,
}

impl Mutator {
    pub fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hard => "hard",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "none" => Some(Self::None),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Rest node options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestOption {
    Heal,
    Focus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&ChapterType::Integration).unwrap(), "\"integration\"");
        assert_eq!(serde_json::to_string(&StatusKind::TechDebt).unwrap(), "\"tech_debt\"");
        assert_eq!(serde_json::to_string(&NodeKind::Treasure).unwrap(), "\"treasure\"");
        assert_eq!(serde_json::to_string(&IntentKind::Charge).unwrap(), "\"charge\"");
    }

    #[test]
    fn mutator_parse_round_trips() {
        for m in [Mutator::None, Mutator::Hard] {
            assert_eq!(Mutator::parse(m.key()), Some(m));
        }
        assert_eq!(Mutator::parse("nightmare"), None);
    }

    #[test]
    fn combat_node_kinds() {
        assert!(NodeKind::Battle.is_combat());
        assert!(NodeKind::Elite.is_combat());
        assert!(NodeKind::Boss.is_combat());
        assert!(!NodeKind::Shop.is_combat());
    }
}
