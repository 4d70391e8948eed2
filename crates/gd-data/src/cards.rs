//! Card definitions — the default card pool.
//!
//! A card is data: a cost, a rarity, tags, and an ordered effect list.
//! Upgrading a card raises its instance upgrade level; the battle
//! engine adds a flat bonus per level to damage/block effects, so no
//! separate "+1" definitions exist.

use gd_types::effect::{CardEffect, EffectTarget};
use gd_types::enums::{CardKind, CardRarity};
use gd_types::ids::CardId;
use gd_types::StatusKind;
use serde::{Deserialize, Serialize};

/// Complete card definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: CardId,
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    pub kind: CardKind,
    pub cost: u32,
    pub rarity: CardRarity,
    pub effects: Vec<CardEffect>,
    #[serde(default)]
    pub tags: Vec<Box<str>>,
}

fn card(
    id: &str,
    kind: CardKind,
    cost: u32,
    rarity: CardRarity,
    effects: Vec<CardEffect>,
    tags: &[&str],
) -> CardDefinition {
    CardDefinition {
        id: CardId::from(id),
        name_key: format!("card.{id}.name").into(),
        desc_key: format!("card.{id}.desc").into(),
        kind,
        cost,
        rarity,
        effects,
        tags: tags.iter().map(|t| Box::from(*t)).collect(),
    }
}

fn damage(value: u32) -> CardEffect {
    CardEffect::Damage { target: EffectTarget::Enemy, value }
}

fn self_damage(value: u32) -> CardEffect {
    CardEffect::Damage { target: EffectTarget::Owner, value }
}

fn block(value: u32) -> CardEffect {
    CardEffect::Block { target: EffectTarget::Owner, value }
}

fn enemy_status(status: StatusKind, stacks: u32) -> CardEffect {
    CardEffect::ApplyStatus { target: EffectTarget::Enemy, status: status.id(), stacks }
}

fn self_status(status: StatusKind, stacks: u32) -> CardEffect {
    CardEffect::ApplyStatus { target: EffectTarget::Owner, status: status.id(), stacks }
}

/// The default card pool, ordered by ID.
pub fn default_cards() -> Vec<CardDefinition> {
    use CardKind::*;
    use CardRarity::*;

    let mut cards = vec![
        // Basics shared by every starter deck
        card("strike", Attack, 1, Common, vec![damage(6)], &["basic", "offensive"]),
        card("defend", Skill, 1, Common, vec![block(5)], &["basic", "defensive"]),
        card(
            "coffee_break",
            Skill,
            1,
            Common,
            vec![CardEffect::GainEnergy { amount: 2 }],
            &["basic"],
        ),
        // Debug archetype
        card(
            "debug_strike",
            Attack,
            1,
            Common,
            vec![damage(6), enemy_status(StatusKind::Vulnerable, 1)],
            &["debug", "offensive"],
        ),
        card(
            "stack_trace",
            Attack,
            2,
            Uncommon,
            vec![damage(10), enemy_status(StatusKind::Burn, 2)],
            &["debug", "offensive", "burn"],
        ),
        card(
            "console_log",
            Skill,
            0,
            Common,
            vec![CardEffect::Draw { count: 2 }],
            &["debug"],
        ),
        card(
            "breakpoint",
            Skill,
            1,
            Uncommon,
            vec![enemy_status(StatusKind::Weak, 2)],
            &["debug"],
        ),
        card(
            "rubber_duck",
            Skill,
            1,
            Uncommon,
            vec![self_status(StatusKind::Focus, 1)],
            &["debug"],
        ),
        card(
            "segfault",
            Attack,
            3,
            Rare,
            vec![damage(24)],
            &["debug", "offensive"],
        ),
        // Test archetype
        card(
            "test_guard",
            Skill,
            1,
            Common,
            vec![block(6), self_status(StatusKind::Thorns, 1)],
            &["test", "defensive"],
        ),
        card(
            "integration_wall",
            Skill,
            2,
            Uncommon,
            vec![block(12)],
            &["test", "defensive"],
        ),
        card(
            "unit_bastion",
            Power,
            2,
            Uncommon,
            vec![self_status(StatusKind::Thorns, 2)],
            &["test", "defensive", "thorns"],
        ),
        card(
            "fuzz_harness",
            Attack,
            1,
            Uncommon,
            vec![damage(4), CardEffect::Draw { count: 1 }],
            &["test", "offensive"],
        ),
        card(
            "mutation_test",
            Attack,
            2,
            Rare,
            vec![damage(8), enemy_status(StatusKind::Vulnerable, 2)],
            &["test", "offensive"],
        ),
        card(
            "merge_shield",
            Skill,
            2,
            Rare,
            vec![block(10), self_status(StatusKind::Charge, 1)],
            &["test", "defensive"],
        ),
        // Refactor archetype
        card(
            "refactor_strike",
            Attack,
            1,
            Common,
            vec![damage(9), self_damage(2)],
            &["refactor", "risk", "offensive"],
        ),
        card(
            "spaghetti_whip",
            Attack,
            2,
            Uncommon,
            vec![damage(14), self_status(StatusKind::TechDebt, 1)],
            &["refactor", "risk"],
        ),
        card(
            "quick_patch",
            Skill,
            0,
            Common,
            vec![
                CardEffect::Heal { target: EffectTarget::Owner, amount: 3 },
                CardEffect::ExhaustSelf,
            ],
            &["refactor"],
        ),
        card(
            "rollback",
            Skill,
            1,
            Rare,
            vec![
                CardEffect::Heal { target: EffectTarget::Owner, amount: 8 },
                CardEffect::ExhaustSelf,
            ],
            &["refactor", "risk"],
        ),
        card(
            "rewrite_in_rust",
            Attack,
            3,
            Legendary,
            vec![damage(30), self_status(StatusKind::TechDebt, 2)],
            &["refactor", "risk", "offensive"],
        ),
    ];
    cards.sort_by(|a, b| a.id.cmp(&b.id));
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_sorted_and_unique() {
        let cards = default_cards();
        for pair in cards.windows(2) {
            assert!(pair[0].id < pair[1].id, "unsorted or duplicate: {}", pair[1].id);
        }
    }

    #[test]
    fn every_attack_card_deals_damage() {
        for c in default_cards() {
            if c.kind == CardKind::Attack {
                assert!(
                    c.effects.iter().any(|e| matches!(
                        e,
                        CardEffect::Damage { target: EffectTarget::Enemy, .. }
                    )),
                    "{} is an attack without enemy damage",
                    c.id
                );
            }
        }
    }

    #[test]
    fn zero_cost_cards_exist_for_thin_turns() {
        let cards = default_cards();
        assert!(cards.iter().any(|c| c.cost == 0));
    }
}
