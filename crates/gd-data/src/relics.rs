//! Relic definitions — the default relic pool.
//!
//! Every relic is a list of {hook, op} bindings; the battle engine
//! fires hooks at its fixed points and never special-cases a relic ID.

use gd_types::effect::{RelicEffect, RelicOp};
use gd_types::enums::{RelicHook, RelicTier};
use gd_types::ids::RelicId;
use gd_types::StatusKind;
use serde::{Deserialize, Serialize};

/// Complete relic definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelicDefinition {
    pub id: RelicId,
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    pub tier: RelicTier,
    pub effects: Vec<RelicEffect>,
    #[serde(default)]
    pub tags: Vec<Box<str>>,
}

fn relic(id: &str, tier: RelicTier, effects: Vec<RelicEffect>, tags: &[&str]) -> RelicDefinition {
    RelicDefinition {
        id: RelicId::from(id),
        name_key: format!("relic.{id}.name").into(),
        desc_key: format!("relic.{id}.desc").into(),
        tier,
        effects,
        tags: tags.iter().map(|t| Box::from(*t)).collect(),
    }
}

fn on(hook: RelicHook, op: RelicOp) -> RelicEffect {
    RelicEffect { hook, op }
}

/// The default relic pool, ordered by ID.
pub fn default_relics() -> Vec<RelicDefinition> {
    use RelicHook::*;
    use RelicTier::*;

    let mut relics = vec![
        relic(
            "git_init",
            Starter,
            vec![on(OnReward, RelicOp::GoldBonusPct { percent: 10 })],
            &["basic"],
        ),
        relic(
            "debugger",
            Uncommon,
            vec![on(
                OnTurnStart,
                RelicOp::StatusEnemy { status: StatusKind::Vulnerable.id(), stacks: 1 },
            )],
            &["debug", "offensive"],
        ),
        relic(
            "test_framework",
            Uncommon,
            vec![on(OnTurnStart, RelicOp::GainBlock { amount: 2 })],
            &["test", "defensive"],
        ),
        relic(
            "legacy_code",
            Uncommon,
            vec![on(
                OnTurnStart,
                RelicOp::StatusSelf { status: StatusKind::Charge.id(), stacks: 1 },
            )],
            &["refactor", "risk"],
        ),
        relic(
            "ci_pipeline",
            Rare,
            vec![on(OnTurnStart, RelicOp::ExtraDraw { count: 1 })],
            &["test"],
        ),
        relic(
            "build_cache",
            Rare,
            vec![on(Passive, RelicOp::RetainBlock)],
            &["test", "defensive"],
        ),
        relic(
            "overclocked_ide",
            Boss,
            vec![on(Passive, RelicOp::MaxEnergy { amount: 1 })],
            &["debug"],
        ),
        relic(
            "coverage_badge",
            Common,
            vec![on(OnDamageTaken, RelicOp::ReflectDamage { amount: 1 })],
            &["test", "thorns"],
        ),
        relic(
            "first_aid_branch",
            Common,
            vec![on(OnReward, RelicOp::HealAfterBattle { amount: 5 })],
            &["refactor"],
        ),
        relic(
            "profiler",
            Uncommon,
            vec![on(OnCardPlayed, RelicOp::GainBlock { amount: 1 })],
            &["debug", "defensive"],
        ),
    ];
    relics.sort_by(|a, b| a.id.cmp(&b.id));
    relics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_sorted_and_unique() {
        let relics = default_relics();
        for pair in relics.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn exactly_one_starter_relic() {
        let starters: Vec<_> = default_relics()
            .into_iter()
            .filter(|r| r.tier == RelicTier::Starter)
            .collect();
        assert_eq!(starters.len(), 1);
        assert_eq!(starters[0].id.as_str(), "git_init");
    }

    #[test]
    fn every_relic_has_at_least_one_hook() {
        for r in default_relics() {
            assert!(!r.effects.is_empty(), "{} has no hooks", r.id);
        }
    }
}
