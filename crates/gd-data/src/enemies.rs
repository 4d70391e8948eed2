//! Enemy definitions — one profile per commit kind.
//!
//! Commits parameterise the numbers (HP, attack, rewards); these
//! definitions supply the behaviour: AI pattern, intent preferences,
//! and reward multipliers. Intent selection rules per pattern:
//! `basic` samples the preference list uniformly, `aggressive` weights
//! attack entries 3x, `defensive` weights defend entries 3x, `cyclic`
//! walks the list by turn index without consuming RNG.

use gd_types::enums::{AiPattern, CommitKind, IntentKind};
use gd_types::ids::EnemyId;
use serde::{Deserialize, Serialize};

/// Complete enemy definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    pub id: EnemyId,
    pub name_key: Box<str>,
    pub kind: CommitKind,
    pub base_hp: u32,
    pub base_damage: u32,
    #[serde(default)]
    pub base_block: u32,
    pub ai_pattern: AiPattern,
    pub intent_preference: Vec<IntentKind>,
    #[serde(default)]
    pub is_boss: bool,
    pub gold_multiplier: f64,
    pub exp_multiplier: f64,
}

#[allow(clippy::too_many_arguments)]
fn enemy(
    id: &str,
    kind: CommitKind,
    base_hp: u32,
    base_damage: u32,
    base_block: u32,
    ai_pattern: AiPattern,
    intent_preference: Vec<IntentKind>,
    is_boss: bool,
    gold_multiplier: f64,
    exp_multiplier: f64,
) -> EnemyDefinition {
    EnemyDefinition {
        id: EnemyId::from(id),
        name_key: format!("enemy.{id}.name").into(),
        kind,
        base_hp,
        base_damage,
        base_block,
        ai_pattern,
        intent_preference,
        is_boss,
        gold_multiplier,
        exp_multiplier,
    }
}

/// The default enemy roster, ordered by ID.
pub fn default_enemies() -> Vec<EnemyDefinition> {
    use AiPattern::*;
    use CommitKind::*;
    use IntentKind::*;

    let mut enemies = vec![
        enemy(
            "feature_gremlin", Feat, 24, 6, 0, Basic,
            vec![Attack, Attack, Defend, Buff], false, 1.0, 1.2,
        ),
        enemy(
            "bug_swarm", Fix, 20, 8, 0, Aggressive,
            vec![Attack, Attack, Debuff], false, 1.1, 1.5,
        ),
        enemy(
            "docs_phantom", Docs, 14, 3, 2, Defensive,
            vec![Defend, Debuff, Attack, Escape], false, 0.8, 0.5,
        ),
        enemy(
            "refactor_golem", Refactor, 30, 5, 4, Cyclic,
            vec![Defend, Attack, Buff], false, 1.2, 1.0,
        ),
        enemy(
            "test_wraith", Test, 18, 4, 3, Defensive,
            vec![Defend, Attack, Debuff], false, 1.0, 0.8,
        ),
        enemy(
            "chore_slime", Chore, 16, 4, 0, Basic,
            vec![Attack, Defend], false, 0.9, 0.6,
        ),
        enemy(
            "merge_conflict_hydra", Merge, 60, 9, 2, Aggressive,
            vec![Attack, Charge, Attack, Debuff], true, 1.5, 2.0,
        ),
        enemy(
            "revert_specter", Revert, 36, 10, 0, Aggressive,
            vec![Attack, Attack, Charge], false, 1.3, 1.8,
        ),
        enemy(
            "legacy_horror", General, 26, 6, 1, Basic,
            vec![Attack, Defend, Debuff], false, 1.0, 1.0,
        ),
    ];
    enemies.sort_by(|a, b| a.id.cmp(&b.id));
    enemies
}

/// The enemy profile used for a commit kind.
pub fn enemy_id_for_kind(kind: CommitKind) -> EnemyId {
    EnemyId::from(match kind {
        CommitKind::Feat => "feature_gremlin",
        CommitKind::Fix => "bug_swarm",
        CommitKind::Docs => "docs_phantom",
        CommitKind::Refactor => "refactor_golem",
        CommitKind::Test => "test_wraith",
        CommitKind::Chore => "chore_slime",
        CommitKind::Merge => "merge_conflict_hydra",
        CommitKind::Revert => "revert_specter",
        CommitKind::General => "legacy_horror",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_commit_kind_has_a_profile() {
        let enemies = default_enemies();
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
            let id = enemy_id_for_kind(kind);
            let def = enemies.iter().find(|e| e.id == id);
            assert!(def.is_some(), "no profile for {kind:?}");
            assert_eq!(def.unwrap().kind, kind);
        }
    }

    #[test]
    fn only_the_merge_profile_is_a_boss() {
        for e in default_enemies() {
            assert_eq!(e.is_boss, e.kind == CommitKind::Merge, "{}", e.id);
        }
    }

    #[test]
    fn preference_lists_are_never_empty() {
        for e in default_enemies() {
            assert!(!e.intent_preference.is_empty(), "{}", e.id);
        }
    }
}
