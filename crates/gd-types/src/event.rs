//! Game events — first-class values emitted by every state transition.
//!
//! Events carry a per-run monotonic `event_id`, the caller-supplied
//! timestamp of the action that produced them, and a small typed
//! payload. Given the same (state, action) pair the emitted list is
//! identical, which is what makes runs replay-verifiable.

use serde::{Deserialize, Serialize};

use crate::effect::Intent;
use crate::enums::{BattleOutcome, ChapterType, RestOption, TurnPhase};
use crate::ids::{CardId, ChapterId, EnemyId, EventId, NodeId, RelicId, StatusId};

/// Outcome of a single event-choice effect, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEffect {
    /// Opcode name, or `error:<opcode>` when the effect failed.
    pub opcode: Box<str>,
    pub success: bool,
}

/// A game event: id, timestamp, and typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub event_id: u64,
    pub at: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Typed event payloads, tagged with `"type"` in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // =========================================================================
    // Lifecycle
    // =========================================================================
    GameStarted {
        run_id: Box<str>,
        seed: u32,
        total_commits: u32,
        chapter_count: u32,
    },
    GameEnded {
        result: Box<str>,
        enemies_defeated: u32,
    },

    // =========================================================================
    // Chapters & route
    // =========================================================================
    ChapterStarted {
        chapter: ChapterId,
        chapter_index: u32,
        chapter_type: ChapterType,
        enemy_count: u32,
        has_boss: bool,
    },
    ChapterCompleted {
        chapter: ChapterId,
        chapter_index: u32,
        chapter_type: ChapterType,
        enemies_defeated: u32,
        gold_reward: u32,
        exp_reward: u32,
    },
    NodeEntered {
        node: NodeId,
        position: u32,
    },

    // =========================================================================
    // Combat
    // =========================================================================
    BattleStarted {
        enemy: EnemyId,
        enemy_name: Box<str>,
        enemy_hp: u32,
        enemy_max_hp: u32,
        is_boss: bool,
    },
    BattleEnded {
        result: BattleOutcome,
    },
    /// A legal escape attempt that lost the roll; the enemy still acts.
    EscapeFailed {},
    TurnStarted {
        turn: u32,
        phase: TurnPhase,
    },
    TurnEnded {
        turn: u32,
        phase: TurnPhase,
    },
    CardsDrawn {
        count: u32,
        reshuffled: bool,
    },
    CardPlayed {
        card: CardId,
        cost: u32,
    },
    EnemyIntentRevealed {
        intent: Intent,
    },
    DamageDealt {
        source: Box<str>,
        target: Box<str>,
        amount: u32,
        blocked: u32,
    },
    StatusApplied {
        target: Box<str>,
        status: StatusId,
        stacks: u32,
    },
    StatusRemoved {
        target: Box<str>,
        status: StatusId,
    },
    Healed {
        target: Box<str>,
        amount: u32,
    },
    EnemyDefeated {
        enemy: EnemyId,
        enemy_name: Box<str>,
        exp_reward: u32,
        gold_reward: u32,
    },

    // =========================================================================
    // Progression & economy
    // =========================================================================
    ExpGained {
        amount: u32,
        total: u32,
        to_next: u32,
    },
    LevelUp {
        new_level: u32,
        old_level: u32,
        hp_gain: u32,
        mp_gain: u32,
        atk_gain: u32,
        def_gain: u32,
    },
    GoldGained {
        amount: u32,
        reason: Box<str>,
    },
    GoldSpent {
        amount: u32,
        reason: Box<str>,
    },
    ItemDropped {
        relic: RelicId,
        source: Box<str>,
    },
    RewardOffered {
        gold: u32,
        card_choices: Vec<CardId>,
        relic: Option<RelicId>,
        heal: u32,
    },
    CardAdded {
        card: CardId,
    },
    CardRemoved {
        card: CardId,
    },
    CardUpgraded {
        card: CardId,
    },
    RelicAdded {
        relic: RelicId,
    },
    RelicRemoved {
        relic: RelicId,
    },

    // =========================================================================
    // Shop / rest / events
    // =========================================================================
    ShopEntered {
        offer_ids: Vec<Box<str>>,
    },
    ItemPurchased {
        offer_id: Box<str>,
        cost: u32,
    },
    RestTaken {
        option: RestOption,
    },
    EventResolved {
        event: EventId,
        choice_id: Box<str>,
        effects_applied: Vec<AppliedEffect>,
        messages: Vec<Box<str>>,
    },

    // =========================================================================
    // Errors
    // =========================================================================
    Error {
        kind: Box<str>,
        message: Box<str>,
    },
}

impl GameEvent {
    /// Whether this is an `error` event.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_flattens_payload() {
        let event = GameEvent {
            event_id: 7,
            at: 1700000000,
            kind: EventKind::GoldGained { amount: 25, reason: "enemy_defeated".into() },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event_id":7,"at":1700000000,"type":"gold_gained","amount":25,"reason":"enemy_defeated"}"#
        );
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn error_detection() {
        let event = GameEvent {
            event_id: 1,
            at: 0,
            kind: EventKind::Error { kind: "illegal_action".into(), message: "no".into() },
        };
        assert!(event.is_error());
    }
}
