//! Declarative effect payloads — card effects, relic hooks, event opcodes.
//!
//! Behaviour lives in `gd-engine` as pure functions pattern-matching on
//! these tags; adding a card or an event is a content change, not a
//! code change.

use serde::{Deserialize, Serialize};

use crate::enums::{IntentKind, RelicHook, StatusKind};
use crate::ids::{ArchetypeId, CardId, RelicId, StatusId};

// =============================================================================
// Card effects
// =============================================================================

/// Target of a card effect, from the card owner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    Enemy,
    #[serde(rename = "self")]
    Owner,
}

/// One step of a card's effect list, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardEffect {
    Damage { target: EffectTarget, value: u32 },
    Block { target: EffectTarget, value: u32 },
    Draw { count: u32 },
    GainEnergy { amount: u32 },
    ApplyStatus { target: EffectTarget, status: StatusId, stacks: u32 },
    Heal { target: EffectTarget, amount: u32 },
    /// The card moves to the exhaust pile instead of the discard pile.
    ExhaustSelf,
}

// =============================================================================
// Relic effects
// =============================================================================

/// What a relic does when its hook fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelicOp {
    GainEnergy { amount: u32 },
    /// Passive: raises effective max energy.
    MaxEnergy { amount: u32 },
    ExtraDraw { count: u32 },
    GainBlock { amount: u32 },
    /// On damage taken: reflect a flat amount to the attacker.
    ReflectDamage { amount: u32 },
    StatusSelf { status: StatusId, stacks: u32 },
    StatusEnemy { status: StatusId, stacks: u32 },
    /// On reward: percentage bonus to gold gains.
    GoldBonusPct { percent: u32 },
    /// Passive: block is not cleared at turn start.
    RetainBlock,
    HealAfterBattle { amount: u32 },
}

/// One hook binding of a relic. Every relic is expressed entirely as a
/// list of these; a relic concept that does not fit the vocabulary is a
/// content-validation error, not a special case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelicEffect {
    pub hook: RelicHook,
    pub op: RelicOp,
}

// =============================================================================
// Event opcodes
// =============================================================================

/// Mutation opcodes carried by event choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EventOpcode {
    GainGold { amount: u32 },
    /// Clamped at zero gold.
    LoseGold { amount: u32 },
    Heal { amount: u32 },
    TakeDamage { amount: u32 },
    AddCard { card: CardId },
    RemoveCard { card: CardId },
    UpgradeCard { card: CardId },
    AddRelic { relic: RelicId },
    RemoveRelic { relic: RelicId },
    ApplyStatus { status: StatusId, stacks: u32 },
    /// Flags the route so the next advance runs a battle of this kind.
    TriggerBattle { kind: Box<str> },
    ModifyBias { archetype: ArchetypeId, delta: f64 },
    SetFlag { key: Box<str>, value: Option<Box<str>> },
}

impl EventOpcode {
    /// The stable opcode name recorded in `effects_applied` entries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GainGold { .. } => "gain_gold",
            Self::LoseGold { .. } => "lose_gold",
            Self::Heal { .. } => "heal",
            Self::TakeDamage { .. } => "take_damage",
            Self::AddCard { .. } => "add_card",
            Self::RemoveCard { .. } => "remove_card",
            Self::UpgradeCard { .. } => "upgrade_card",
            Self::AddRelic { .. } => "add_relic",
            Self::RemoveRelic { .. } => "remove_relic",
            Self::ApplyStatus { .. } => "apply_status",
            Self::TriggerBattle { .. } => "trigger_battle",
            Self::ModifyBias { .. } => "modify_bias",
            Self::SetFlag { .. } => "set_flag",
        }
    }
}

// =============================================================================
// Intents
// =============================================================================

/// An enemy's pre-declared action for its next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub value: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusId>,
    #[serde(default)]
    pub status_stacks: u32,
}

impl Intent {
    pub fn attack(value: i32) -> Self {
        Self { kind: IntentKind::Attack, value, status: None, status_stacks: 0 }
    }

    pub fn defend(value: i32) -> Self {
        Self { kind: IntentKind::Defend, value, status: None, status_stacks: 0 }
    }
}

/// Convenience: the stock status kinds map onto fixed IDs.
impl StatusKind {
    pub fn id(self) -> StatusId {
        StatusId::from(match self {
            Self::Vulnerable => "vulnerable",
            Self::Weak => "weak",
            Self::Burn => "burn",
            Self::Thorns => "thorns",
            Self::Charge => "charge",
            Self::Focus => "focus",
            Self::TechDebt => "tech_debt",
            Self::Bug => "bug",
        })
    }
}
