//! Player action types — discriminated union for everything a run
//! accepts through `Engine::apply`.

use serde::{Deserialize, Serialize};

use crate::enums::RestOption;

/// Which part of a pending reward bundle the player takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pick", rename_all = "snake_case")]
pub enum RewardPick {
    /// One of the (up to three) offered cards, by offer index.
    Card { index: usize },
    Relic,
    Heal,
    /// Decline everything except the automatic gold.
    Skip,
}

/// All player actions as a discriminated union.
///
/// Serialized with `"type"` as the tag field; the action log in a save
/// document is a list of these plus timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // =========================================================================
    // Route traversal
    // =========================================================================
    /// Move to the next node of the current chapter route and
    /// materialise its encounter.
    AdvanceNode,

    // =========================================================================
    // Combat
    // =========================================================================
    /// Begin the battle at a combat node (builds piles, draws the
    /// starting hand, reveals the first intent).
    StartCombat,
    PlayCard { hand_index: usize },
    /// Brace: gain block and cede the turn to the enemy.
    Defend,
    EndTurn,
    /// Attempt to flee (non-boss encounters only).
    Escape,

    // =========================================================================
    // Encounters
    // =========================================================================
    EventChoice { choice_index: usize },
    ShopBuy { offer_id: Box<str> },
    ShopSkip,
    RestChoice { option: RestOption },

    // =========================================================================
    // Rewards
    // =========================================================================
    PickReward {
        #[serde(flatten)]
        pick: RewardPick,
    },
}

/// One logged action: the action plus the caller-supplied timestamp
/// that stamps every event it produces. Replaying the log therefore
/// reproduces the event stream byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(flatten)]
    pub action: Action,
    pub at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_tag_with_type() {
        let json = serde_json::to_string(&Action::PlayCard { hand_index: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"play_card","hand_index":2}"#);
    }

    #[test]
    fn reward_pick_flattens() {
        let action = Action::PickReward { pick: RewardPick::Card { index: 1 } };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"pick_reward","pick":"card","index":1}"#);
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn action_record_flattens_action() {
        let record = ActionRecord { action: Action::EndTurn, at: 1700000000 };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"type":"end_turn","at":1700000000}"#);
        let back: ActionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
