//! The event-opcode interpreter and event selection.
//!
//! An event choice is an ordered opcode list. Effects apply in order;
//! a failed effect is recorded as `error:<opcode>` and later effects
//! still run, unless the failure was fatal (the player died).

use std::collections::BTreeMap;

use gd_data::events::EventDefinition;
use gd_data::ContentRegistry;
use gd_types::effect::EventOpcode;
use gd_types::event::AppliedEffect;
use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::{CardFlags, CardInstance, GameState, RouteNode};
use gd_types::{EventId, NodeKind, NodeTag};

use crate::status::apply_status;

/// Interpreter result: what applied, what the player should read, and
/// a coarse change summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EventChoiceResult {
    pub success: bool,
    pub effects_applied: Vec<AppliedEffect>,
    pub messages: Vec<Box<str>>,
    pub state_changes: BTreeMap<Box<str>, i64>,
}

fn ok(result: &mut EventChoiceResult, op: &EventOpcode) {
    result.effects_applied.push(AppliedEffect { opcode: op.name().into(), success: true });
}

fn fail(result: &mut EventChoiceResult, op: &EventOpcode) {
    result
        .effects_applied
        .push(AppliedEffect { opcode: format!("error:{}", op.name()).into(), success: false });
    result.success = false;
}

/// Apply one choice's effects to the state, in order.
pub fn apply_event_choice(
    state: &mut GameState,
    registry: &ContentRegistry,
    effects: &[EventOpcode],
) -> EventChoiceResult {
    let mut result = EventChoiceResult {
        success: true,
        effects_applied: Vec::new(),
        messages: Vec::new(),
        state_changes: BTreeMap::new(),
    };

    for op in effects {
        let mut fatal = false;
        match op {
            EventOpcode::GainGold { amount } => {
                state.player.gold += amount;
                result.messages.push(format!("+{amount} gold").into());
                *result.state_changes.entry("gold".into()).or_insert(0) += i64::from(*amount);
                ok(&mut result, op);
            }
            EventOpcode::LoseGold { amount } => {
                let lost = (*amount).min(state.player.gold);
                state.player.gold -= lost;
                result.messages.push(format!("-{lost} gold").into());
                *result.state_changes.entry("gold".into()).or_insert(0) -= i64::from(lost);
                ok(&mut result, op);
            }
            EventOpcode::Heal { amount } => {
                let healed = state.player.character.heal(*amount);
                result.messages.push(format!("+{healed} HP").into());
                *result.state_changes.entry("hp".into()).or_insert(0) += i64::from(healed);
                ok(&mut result, op);
            }
            EventOpcode::TakeDamage { amount } => {
                let lost = state.player.character.lose_hp(*amount);
                result.messages.push(format!("-{lost} HP").into());
                *result.state_changes.entry("hp".into()).or_insert(0) -= i64::from(lost);
                ok(&mut result, op);
                fatal = state.player.character.is_dead();
            }
            EventOpcode::AddCard { card } => {
                if registry.card(card).is_some() {
                    let mut instance = CardInstance::new(card.clone());
                    instance.flags.insert(CardFlags::ACQUIRED);
                    state.player.deck.push(instance);
                    result.messages.push(format!("Added card {card}").into());
                    ok(&mut result, op);
                } else {
                    fail(&mut result, op);
                }
            }
            EventOpcode::RemoveCard { card } => {
                match state.player.deck.iter().position(|c| &c.card == card) {
                    Some(pos) => {
                        state.player.deck.remove(pos);
                        result.messages.push(format!("Removed card {card}").into());
                        ok(&mut result, op);
                    }
                    None => fail(&mut result, op),
                }
            }
            EventOpcode::UpgradeCard { card } => {
                let target = state
                    .player
                    .deck
                    .iter_mut()
                    .filter(|c| &c.card == card)
                    .min_by_key(|c| c.upgrade);
                match target {
                    Some(instance) => {
                        instance.upgrade += 1;
                        result.messages.push(format!("Upgraded card {card}").into());
                        ok(&mut result, op);
                    }
                    None => fail(&mut result, op),
                }
            }
            EventOpcode::AddRelic { relic } => {
                if registry.relic(relic).is_some() && !state.player.relics.contains(relic) {
                    state.player.relics.push(relic.clone());
                    result.messages.push(format!("Gained relic {relic}").into());
                    ok(&mut result, op);
                } else {
                    fail(&mut result, op);
                }
            }
            EventOpcode::RemoveRelic { relic } => {
                match state.player.relics.iter().position(|r| r == relic) {
                    Some(pos) => {
                        state.player.relics.remove(pos);
                        result.messages.push(format!("Lost relic {relic}").into());
                        ok(&mut result, op);
                    }
                    None => fail(&mut result, op),
                }
            }
            EventOpcode::ApplyStatus { status, stacks } => {
                if registry.status(status).is_some() {
                    let applied = apply_status(
                        &mut state.player.character.statuses,
                        registry,
                        status,
                        (*stacks).max(1),
                        None,
                    );
                    result.messages.push(format!("{status} x{applied}").into());
                    ok(&mut result, op);
                } else {
                    fail(&mut result, op);
                }
            }
            EventOpcode::TriggerBattle { kind } => {
                state.route.pending_battle = Some(kind.clone());
                result.messages.push(format!("A {kind} battle looms").into());
                ok(&mut result, op);
            }
            EventOpcode::ModifyBias { archetype, delta } => {
                let bias = &mut state.player.bias;
                let slot = match archetype.as_str() {
                    "debug_beatdown" => Some(&mut bias.debug),
                    "test_shrine" => Some(&mut bias.test),
                    "refactor_risk" => Some(&mut bias.refactor),
                    _ => None,
                };
                match slot {
                    Some(weight) => {
                        *weight = (*weight + delta).max(0.0);
                        ok(&mut result, op);
                    }
                    None => fail(&mut result, op),
                }
            }
            EventOpcode::SetFlag { key, value } => {
                let stored = value.clone().unwrap_or_else(|| "true".into());
                state.route.flags.insert(key.clone(), stored);
                ok(&mut result, op);
            }
        }
        if fatal {
            break;
        }
    }
    result
}

// =============================================================================
// Event selection
// =============================================================================

fn preferred_tags(node: &RouteNode) -> Vec<&'static str> {
    let mut tags: Vec<&'static str> = node
        .tags
        .iter()
        .map(|t| match t {
            NodeTag::Risk => "risk",
            NodeTag::Safe => "safe",
            NodeTag::Greed => "greed",
            NodeTag::Milestone => "milestone",
        })
        .collect();
    match node.kind {
        NodeKind::Shop => tags.extend(["shop", "greed"]),
        NodeKind::Rest => tags.push("safe"),
        NodeKind::Elite => tags.push("risk"),
        _ => {}
    }
    tags
}

/// Pick the event for an event node, deterministically from the
/// event-select stream, the node's tags, and per-chapter-type weights.
pub fn select_event_for_node(
    state: &GameState,
    registry: &ContentRegistry,
    node: &RouteNode,
) -> Option<EventId> {
    if registry.events.is_empty() {
        return None;
    }
    let chapter = state.chapter()?;

    // BTreeMap iteration gives a stable, id-sorted candidate order.
    let all: Vec<&EventDefinition> = registry.events.values().collect();
    let preferred = preferred_tags(node);
    let filtered: Vec<&EventDefinition> = all
        .iter()
        .copied()
        .filter(|e| {
            e.route_tags.is_empty()
                || preferred.is_empty()
                || e.route_tags.iter().any(|t| preferred.contains(&t.as_ref()))
        })
        .collect();
    let candidates = if filtered.is_empty() { all } else { filtered };

    let chapter_key = chapter.chapter_type.key();
    let weights: Vec<f64> = candidates
        .iter()
        .map(|e| {
            let w = e
                .weights
                .get(chapter_key)
                .or_else(|| e.weights.get("default"))
                .copied()
                .unwrap_or(1);
            f64::from(w.max(1))
        })
        .collect();

    let mut rng =
        RngState::stream(state.seed, StreamDomain::EventSelect, &[chapter.index, node.position]);
    let pick = rng.weighted_index(&weights)?;
    Some(candidates[pick].id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::tests::test_state;
    use gd_data::registry::build_default_registry;
    use gd_types::CardId;

    #[test]
    fn happy_path_gold_heal_card() {
        // gain_gold(+50), heal(+30), add_card(debug_strike) from
        // gold 10, HP 40/100.
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        state.player.gold = 10;
        state.player.character.current_hp = 40;
        let deck_before = state.player.deck.len();

        let effects = vec![
            EventOpcode::GainGold { amount: 50 },
            EventOpcode::Heal { amount: 30 },
            EventOpcode::AddCard { card: CardId::from("debug_strike") },
        ];
        let result = apply_event_choice(&mut state, &registry, &effects);

        assert!(result.success);
        assert_eq!(state.player.gold, 60);
        assert_eq!(state.player.character.current_hp, 70);
        assert_eq!(state.player.deck.len(), deck_before + 1);
        assert_eq!(result.effects_applied.len(), 3);
        assert!(result.effects_applied.iter().all(|e| e.success));
        assert!(result.messages.iter().any(|m| m.contains("+50")));
        assert!(result.messages.iter().any(|m| m.contains("+30")));
    }

    #[test]
    fn empty_effect_list_changes_nothing() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        let before = state.clone();
        let result = apply_event_choice(&mut state, &registry, &[]);
        assert!(result.success);
        assert!(result.effects_applied.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn lose_gold_clamps_at_zero() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        state.player.gold = 10;
        let result =
            apply_event_choice(&mut state, &registry, &[EventOpcode::LoseGold { amount: 50 }]);
        assert_eq!(state.player.gold, 0);
        assert!(result.success);
    }

    #[test]
    fn failed_effect_is_recorded_and_the_rest_still_run() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        let effects = vec![
            EventOpcode::RemoveCard { card: CardId::from("not_in_deck") },
            EventOpcode::GainGold { amount: 5 },
        ];
        let before_gold = state.player.gold;
        let result = apply_event_choice(&mut state, &registry, &effects);
        assert!(!result.success);
        assert_eq!(result.effects_applied[0].opcode.as_ref(), "error:remove_card");
        assert!(!result.effects_applied[0].success);
        assert!(result.effects_applied[1].success);
        assert_eq!(state.player.gold, before_gold + 5);
    }

    #[test]
    fn fatal_damage_stops_the_list() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        state.player.character.current_hp = 3;
        let effects = vec![
            EventOpcode::TakeDamage { amount: 10 },
            EventOpcode::GainGold { amount: 999 },
        ];
        let before_gold = state.player.gold;
        let result = apply_event_choice(&mut state, &registry, &effects);
        assert!(state.player.character.is_dead());
        assert_eq!(result.effects_applied.len(), 1);
        assert_eq!(state.player.gold, before_gold);
    }

    #[test]
    fn trigger_battle_arms_the_route() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        apply_event_choice(
            &mut state,
            &registry,
            &[EventOpcode::TriggerBattle { kind: "elite".into() }],
        );
        assert_eq!(state.route.pending_battle.as_deref(), Some("elite"));
    }

    #[test]
    fn upgrade_targets_the_lowest_level_copy() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        // The starter deck holds two plain strikes.
        apply_event_choice(
            &mut state,
            &registry,
            &[EventOpcode::UpgradeCard { card: CardId::from("strike") }],
        );
        let upgrades: Vec<u8> = state
            .player
            .deck
            .iter()
            .filter(|c| c.card.as_str() == "strike")
            .map(|c| c.upgrade)
            .collect();
        assert!(upgrades.contains(&1));
        assert!(upgrades.contains(&0));
    }

    #[test]
    fn event_selection_is_deterministic() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let node = state.route.nodes[0].clone();
        let a = select_event_for_node(&state, &registry, &node);
        let b = select_event_for_node(&state, &registry, &node);
        assert_eq!(a, b);
        assert!(a.is_some());
    }
}
