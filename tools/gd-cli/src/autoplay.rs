//! The advisory auto-play policy.
//!
//! Strictly a consumer of the engine's public surface: it reads state
//! and proposes an action, and the engine never consults it. Scores
//! are deterministic so `--auto` runs replay cleanly.

use gd_data::ContentRegistry;
use gd_types::action::{Action, RewardPick};
use gd_types::effect::EventOpcode;
use gd_types::state::{Encounter, GameState};
use gd_types::RestOption;

/// Coarse value of an event choice: HP and gold deltas minus risk.
fn score_event_choice(effects: &[EventOpcode], state: &GameState) -> i64 {
    let hp_missing =
        i64::from(state.player.character.max_hp() - state.player.character.current_hp);
    let mut score = 0i64;
    for op in effects {
        match op {
            EventOpcode::GainGold { amount } => score += i64::from(*amount),
            EventOpcode::LoseGold { amount } => score -= i64::from(*amount),
            EventOpcode::Heal { amount } => score += i64::from(*amount).min(hp_missing) * 2,
            EventOpcode::TakeDamage { amount } => score -= i64::from(*amount) * 3,
            EventOpcode::AddRelic { .. } => score += 60,
            EventOpcode::AddCard { .. } | EventOpcode::UpgradeCard { .. } => score += 30,
            EventOpcode::TriggerBattle { .. } => score -= 40,
            EventOpcode::ApplyStatus { .. } => score -= 20,
            _ => {}
        }
    }
    score
}

/// Decide the next action for the current state.
pub fn choose_action(state: &GameState, registry: &ContentRegistry) -> Action {
    if let Some(reward) = &state.pending_reward {
        let pick = if !reward.card_choices.is_empty() {
            RewardPick::Card { index: 0 }
        } else if reward.heal > 0 {
            RewardPick::Heal
        } else if reward.relic.is_some() {
            RewardPick::Relic
        } else {
            RewardPick::Skip
        };
        return Action::PickReward { pick };
    }

    match &state.encounter {
        Some(Encounter::Battle(_)) if !state.in_combat => Action::StartCombat,
        Some(Encounter::Battle(battle)) => {
            // Highest-damage affordable card first; block when hurt.
            let mut best: Option<(usize, i64)> = None;
            for (index, instance) in battle.deck.hand.iter().enumerate() {
                let Some(card) = registry.card(&instance.card) else { continue };
                if card.cost > state.player.energy.current {
                    continue;
                }
                let mut value = 0i64;
                for effect in &card.effects {
                    match effect {
                        gd_types::effect::CardEffect::Damage {
                            target: gd_types::effect::EffectTarget::Enemy,
                            value: v,
                        } => value += i64::from(*v) * 2,
                        gd_types::effect::CardEffect::Block { value: v, .. } => {
                            let hurt = state.player.character.current_hp
                                < state.player.character.max_hp() / 2;
                            value += i64::from(*v) * if hurt { 2 } else { 1 };
                        }
                        gd_types::effect::CardEffect::Draw { count } => {
                            value += i64::from(*count) * 3
                        }
                        _ => value += 2,
                    }
                }
                if best.map_or(true, |(_, b)| value > b) {
                    best = Some((index, value));
                }
            }
            match best {
                Some((index, _)) => Action::PlayCard { hand_index: index },
                None => Action::EndTurn,
            }
        }
        Some(Encounter::Event(encounter)) => {
            let choice_index = registry
                .event(&encounter.event)
                .map(|event| {
                    event
                        .choices
                        .iter()
                        .enumerate()
                        .max_by_key(|(i, c)| (score_event_choice(&c.effects, state), usize::MAX - i))
                        .map_or(0, |(i, _)| i)
                })
                .unwrap_or(0);
            Action::EventChoice { choice_index }
        }
        Some(Encounter::Shop(shop)) => {
            let hurt =
                state.player.character.current_hp < state.player.character.max_hp() / 2;
            let pick = shop.offers.iter().find(|offer| {
                offer.cost <= state.player.gold
                    && !shop.purchased.contains(&offer.id)
                    && (offer.heal > 0) == hurt
            });
            match pick {
                Some(offer) => Action::ShopBuy { offer_id: offer.id.clone() },
                None => Action::ShopSkip,
            }
        }
        Some(Encounter::Rest) => {
            let hurt =
                state.player.character.current_hp < state.player.character.max_hp() * 6 / 10;
            Action::RestChoice { option: if hurt { RestOption::Heal } else { RestOption::Focus } }
        }
        None => Action::AdvanceNode,
    }
}
