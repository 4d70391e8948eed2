//! Event definitions — the default encounter events.
//!
//! An event is choices over opcode lists; the interpreter in the
//! engine applies them in order. Weights are per chapter type with a
//! `"default"` fallback, and `route_tags` bias which nodes see the
//! event.

use std::collections::BTreeMap;

use gd_types::effect::EventOpcode;
use gd_types::ids::{CardId, EventId, RelicId};
use serde::{Deserialize, Serialize};

/// One selectable choice of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    pub id: Box<str>,
    pub text_key: Box<str>,
    pub effects: Vec<EventOpcode>,
}

/// Complete event definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: EventId,
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    #[serde(default)]
    pub route_tags: Vec<Box<str>>,
    /// Chapter-type key -> weight; `"default"` is the fallback weight.
    #[serde(default)]
    pub weights: BTreeMap<Box<str>, u32>,
    pub choices: Vec<EventChoice>,
}

fn choice(id: &str, effects: Vec<EventOpcode>) -> EventChoice {
    EventChoice {
        id: id.into(),
        text_key: format!("event.choice.{id}").into(),
        effects,
    }
}

fn event(
    id: &str,
    route_tags: &[&str],
    weights: &[(&str, u32)],
    choices: Vec<EventChoice>,
) -> EventDefinition {
    EventDefinition {
        id: EventId::from(id),
        name_key: format!("event.{id}.name").into(),
        desc_key: format!("event.{id}.desc").into(),
        route_tags: route_tags.iter().map(|t| Box::from(*t)).collect(),
        weights: weights.iter().map(|(k, w)| (Box::from(*k), *w)).collect(),
        choices,
    }
}

/// The default event pool, ordered by ID.
pub fn default_events() -> Vec<EventDefinition> {
    let mut events = vec![
        event(
            "forgotten_stash",
            &["greed"],
            &[("default", 2), ("legacy", 4)],
            vec![
                choice("take_gold", vec![EventOpcode::GainGold { amount: 50 }]),
                choice("leave", vec![]),
            ],
        ),
        event(
            "code_review",
            &["safe"],
            &[("default", 2), ("fix", 3)],
            vec![
                choice("accept_patch", vec![EventOpcode::UpgradeCard { card: CardId::from("strike") }]),
                choice(
                    "rip_it_out",
                    vec![
                        EventOpcode::RemoveCard { card: CardId::from("strike") },
                        EventOpcode::GainGold { amount: 20 },
                    ],
                ),
            ],
        ),
        event(
            "cursed_dependency",
            &["risk"],
            &[("default", 2), ("fix", 3)],
            vec![
                choice(
                    "install",
                    vec![
                        EventOpcode::AddCard { card: CardId::from("spaghetti_whip") },
                        EventOpcode::GainGold { amount: 30 },
                    ],
                ),
                choice("audit_first", vec![EventOpcode::LoseGold { amount: 15 }]),
            ],
        ),
        event(
            "rubber_duck_shrine",
            &["safe"],
            &[("default", 2)],
            vec![
                choice("pray", vec![EventOpcode::Heal { amount: 30 }]),
                choice(
                    "donate",
                    vec![
                        EventOpcode::LoseGold { amount: 25 },
                        EventOpcode::AddRelic { relic: RelicId::from("coverage_badge") },
                    ],
                ),
            ],
        ),
        event(
            "merge_ambush",
            &["risk"],
            &[("default", 1), ("integration", 4)],
            vec![
                choice("fight", vec![EventOpcode::TriggerBattle { kind: "elite".into() }]),
                choice(
                    "flee",
                    vec![
                        EventOpcode::TakeDamage { amount: 8 },
                        EventOpcode::SetFlag { key: "fled_ambush".into(), value: None },
                    ],
                ),
            ],
        ),
        event(
            "pair_programming",
            &["safe"],
            &[("default", 2), ("feature", 3)],
            vec![
                choice(
                    "join",
                    vec![
                        EventOpcode::AddCard { card: CardId::from("fuzz_harness") },
                        EventOpcode::ModifyBias {
                            archetype: "test_shrine".into(),
                            delta: 0.2,
                        },
                    ],
                ),
                choice("decline", vec![EventOpcode::Heal { amount: 10 }]),
            ],
        ),
    ];
    events.sort_by(|a, b| a.id.cmp(&b.id));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_sorted_and_unique() {
        let events = default_events();
        for pair in events.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn every_event_has_a_default_weight_or_tag_weights() {
        for e in default_events() {
            assert!(e.weights.contains_key("default"), "{}", e.id);
            assert!(!e.choices.is_empty(), "{}", e.id);
        }
    }

    #[test]
    fn leave_choice_is_genuinely_empty() {
        let events = default_events();
        let stash = events.iter().find(|e| e.id.as_str() == "forgotten_stash").unwrap();
        let leave = stash.choices.iter().find(|c| c.id.as_ref() == "leave").unwrap();
        assert!(leave.effects.is_empty());
    }
}
