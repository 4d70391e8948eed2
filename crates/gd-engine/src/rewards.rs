//! Rewards, experience, and archetype bias.
//!
//! Gold is granted automatically with ±20% jitter from the reward
//! stream; the card/relic/heal bundle waits for exactly one
//! `pick_reward` action. Picks feed the archetype bias through the
//! fixed tag map, and the bias in turn weights future card pools.

use gd_data::archetypes::archetype_for_tag;
use gd_data::ContentRegistry;
use gd_types::effect::{RelicOp, RelicEffect};
use gd_types::event::EventKind;
use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::*;
use gd_types::{
    CardId, CommitKind, CardRarity, EngineError, GameEvent, RelicHook, RelicId, RelicTier,
};

use crate::action_pipeline::emit;
use crate::chapters::mutator_scales;

/// Flat gold base for battle rewards, before bonuses.
const BASE_GOLD: f64 = 10.0;
/// Boss battles pay out this multiple of the base.
const BOSS_GOLD_MULTIPLIER: f64 = 3.0;
/// Relic drop chance for plain encounters.
const RELIC_CHANCE: f64 = 0.05;
/// Relic drop chance for bosses and merge enemies.
const RELIC_CHANCE_ELITE: f64 = 0.10;
/// Healing is offered below this fraction of max HP.
const HEAL_OFFER_THRESHOLD: f64 = 0.5;
/// Bias added per mapped tag on a picked reward.
const BIAS_PER_TAG: f64 = 0.1;

// =============================================================================
// Experience and levels
// =============================================================================

/// Grant experience, levelling up as thresholds pass. Level-ups raise
/// stat bases (hp +10, mp +5, attack +2, defense +1) and refill 30% of
/// max HP.
pub(crate) fn grant_experience(
    state: &mut GameState,
    amount: u32,
    at: i64,
    out: &mut Vec<GameEvent>,
) {
    if amount == 0 {
        return;
    }
    let character = &mut state.player.character;
    character.experience += amount;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::ExpGained {
            amount,
            total: state.player.character.experience,
            to_next: state.player.character.experience_to_next(),
        },
    );

    loop {
        let need = state.player.character.experience_to_next();
        if state.player.character.experience < need {
            break;
        }
        let character = &mut state.player.character;
        character.experience -= need;
        let old_level = character.level;
        character.level += 1;
        character.stats.hp.base += 10;
        character.stats.mp.base += 5;
        character.stats.attack.base += 2;
        character.stats.defense.base += 1;
        let refill = (character.max_hp() as f64 * 0.3) as u32;
        character.heal(refill);
        let new_level = character.level;
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::LevelUp {
                new_level,
                old_level,
                hp_gain: 10,
                mp_gain: 5,
                atk_gain: 2,
                def_gain: 1,
            },
        );
    }
}

// =============================================================================
// Bias
// =============================================================================

/// Record a pick's tags into the bias via the fixed tag map.
pub(crate) fn record_pick_tags(bias: &mut ArchetypeBias, tags: &[Box<str>]) {
    for tag in tags {
        *bias.tag_counts.entry(tag.clone()).or_insert(0) += 1;
        match archetype_for_tag(tag) {
            Some("debug_beatdown") => bias.debug += BIAS_PER_TAG,
            Some("test_shrine") => bias.test += BIAS_PER_TAG,
            Some("refactor_risk") => bias.refactor += BIAS_PER_TAG,
            _ => {}
        }
    }
}

/// Bias weight factor for a card's tags: 1 + the normalised share of
/// the archetype its first mapped tag feeds.
fn bias_factor(bias: &ArchetypeBias, tags: &[Box<str>]) -> f64 {
    let (debug, test, refactor) = bias.normalized();
    for tag in tags {
        match archetype_for_tag(tag) {
            Some("debug_beatdown") => return 1.0 + debug,
            Some("test_shrine") => return 1.0 + test,
            Some("refactor_risk") => return 1.0 + refactor,
            _ => {}
        }
    }
    1.0
}

// =============================================================================
// Bundle generation
// =============================================================================

fn gold_bonus_percent(state: &GameState, registry: &ContentRegistry) -> u32 {
    let mut percent = 0;
    for relic_id in &state.player.relics {
        if let Some(relic) = registry.relic(relic_id) {
            for RelicEffect { hook, op } in &relic.effects {
                if *hook == RelicHook::OnReward {
                    if let RelicOp::GoldBonusPct { percent: p } = op {
                        percent += p;
                    }
                }
            }
        }
    }
    percent
}

fn card_pool_weights(
    state: &GameState,
    registry: &ContentRegistry,
    enemy: &EnemyState,
) -> (Vec<CardId>, Vec<f64>) {
    let owned: Vec<&CardId> = state.player.deck.iter().map(|c| &c.card).collect();
    let large_diff = enemy.attack > 8 || enemy.max_hp > 40;
    let is_merge = enemy.kind == CommitKind::Merge;

    let mut ids = Vec::new();
    let mut weights = Vec::new();
    for card in registry.cards.values() {
        if owned.contains(&&card.id) {
            continue;
        }
        let mut weight = bias_factor(&state.player.bias, &card.tags);
        let offensive = card.tags.iter().any(|t| t.as_ref() == "offensive");
        if large_diff && offensive {
            weight *= 2.0;
            if card.cost >= 2 {
                weight *= 1.5;
            }
        }
        if is_merge && card.rarity >= CardRarity::Rare {
            weight *= 2.0;
        }
        if (enemy.is_boss || is_merge) && card.rarity == CardRarity::Common {
            weight *= 0.5;
        }
        ids.push(card.id.clone());
        weights.push(weight);
    }
    (ids, weights)
}

/// Generate the post-battle bundle: jittered gold (granted now), three
/// card choices, an optional relic, an optional heal.
pub(crate) fn offer_battle_rewards(
    state: &mut GameState,
    registry: &ContentRegistry,
    enemy: &EnemyState,
    chapter_index: u32,
    node_position: u32,
    at: i64,
    out: &mut Vec<GameEvent>,
) {
    let mut rng = RngState::stream(state.seed, StreamDomain::Reward, &[chapter_index, node_position]);

    // Gold: flat base times the enemy-kind bonus, tripled for bosses,
    // scaled by the chapter's gold bonus and the mutator, with ±20%
    // jitter, plus relic percentage bonuses.
    let type_bonus = registry.enemy_for_kind(enemy.kind).map_or(1.0, |p| p.gold_multiplier);
    let boss_bonus = if enemy.is_boss { BOSS_GOLD_MULTIPLIER } else { 1.0 };
    let chapter_bonus = state
        .chapters
        .get(chapter_index as usize)
        .map_or(1.0, |c| registry.chapter_tuning(c.chapter_type).gold_bonus);
    let (_, _, reward_scale) = mutator_scales(state.mutator);
    let jitter = 0.8 + 0.4 * rng.next_f64();
    let mut gold =
        (BASE_GOLD * type_bonus * boss_bonus * chapter_bonus * reward_scale * jitter) as u32;
    gold += gold * gold_bonus_percent(state, registry) / 100;
    state.player.gold += gold;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::GoldGained { amount: gold, reason: "battle_reward".into() },
    );

    // Relic heal-after-battle hooks.
    let relic_ids = state.player.relics.clone();
    for relic_id in &relic_ids {
        let Some(relic) = registry.relic(relic_id) else { continue };
        for effect in &relic.effects {
            if effect.hook == RelicHook::OnReward {
                if let RelicOp::HealAfterBattle { amount } = effect.op {
                    let healed = state.player.character.heal(amount);
                    if healed > 0 {
                        emit(
                            &mut state.next_event_id,
                            out,
                            at,
                            EventKind::Healed { target: "player".into(), amount: healed },
                        );
                    }
                }
            }
        }
    }

    // Three distinct card choices from the weighted pool.
    let (mut ids, mut weights) = card_pool_weights(state, registry, enemy);
    let mut card_choices = Vec::new();
    while card_choices.len() < REWARD_CARD_CHOICES && !ids.is_empty() {
        match rng.weighted_index(&weights) {
            Some(pick) => {
                card_choices.push(ids.remove(pick));
                weights.remove(pick);
            }
            None => break,
        }
    }

    // Optional relic drop.
    let relic_chance = if enemy.is_boss || enemy.kind == CommitKind::Merge {
        RELIC_CHANCE_ELITE
    } else {
        RELIC_CHANCE
    };
    let relic = if rng.chance(relic_chance) {
        let candidates: Vec<&RelicId> = registry
            .relics
            .values()
            .filter(|r| r.tier != RelicTier::Starter && !state.player.relics.contains(&r.id))
            .map(|r| &r.id)
            .collect();
        rng.random_index(candidates.len()).map(|i| candidates[i].clone())
    } else {
        None
    };

    // Healing offer when under half HP.
    let character = &state.player.character;
    let heal = if f64::from(character.current_hp)
        < f64::from(character.max_hp()) * HEAL_OFFER_THRESHOLD
    {
        10u32.min(character.max_hp() - character.current_hp)
    } else {
        0
    };

    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::RewardOffered {
            gold,
            card_choices: card_choices.clone(),
            relic: relic.clone(),
            heal,
        },
    );
    state.pending_reward = Some(RewardState { card_choices, relic, heal });
}

// =============================================================================
// Picks
// =============================================================================

/// Resolve the pending bundle with exactly one pick.
pub(crate) fn apply_reward_pick(
    state: &mut GameState,
    registry: &ContentRegistry,
    pick: &gd_types::action::RewardPick,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    use gd_types::action::RewardPick;

    let Some(reward) = state.pending_reward.clone() else {
        return Err(EngineError::illegal("no reward pending"));
    };

    match pick {
        RewardPick::Card { index } => {
            let Some(card_id) = reward.card_choices.get(*index) else {
                return Err(EngineError::illegal("no card offer at that index"));
            };
            let Some(card) = registry.card(card_id) else {
                return Err(EngineError::illegal(format!("unknown card '{card_id}'")));
            };
            let mut instance = CardInstance::new(card.id.clone());
            instance.flags.insert(CardFlags::ACQUIRED);
            state.player.deck.push(instance);
            record_pick_tags(&mut state.player.bias, &card.tags);
            emit(&mut state.next_event_id, out, at, EventKind::CardAdded { card: card.id.clone() });
        }
        RewardPick::Relic => {
            let Some(relic_id) = &reward.relic else {
                return Err(EngineError::illegal("no relic was offered"));
            };
            let Some(relic) = registry.relic(relic_id) else {
                return Err(EngineError::illegal(format!("unknown relic '{relic_id}'")));
            };
            state.player.relics.push(relic.id.clone());
            record_pick_tags(&mut state.player.bias, &relic.tags);
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::RelicAdded { relic: relic.id.clone() },
            );
        }
        RewardPick::Heal => {
            if reward.heal == 0 {
                return Err(EngineError::illegal("no healing was offered"));
            }
            let healed = state.player.character.heal(reward.heal);
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::Healed { target: "player".into(), amount: healed },
            );
        }
        RewardPick::Skip => {}
    }

    state.pending_reward = None;
    Ok(())
}

// =============================================================================
// Chapter completion
// =============================================================================

/// Chapter completion rewards: gold and experience scaled by the
/// chapter's bonuses and depth, shrunk by hard mutators.
pub(crate) fn complete_chapter(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) {
    let Some(chapter) = state.chapter() else { return };
    let chapter = chapter.clone();
    let tuning = registry.chapter_tuning(chapter.chapter_type);
    let (_, _, reward_scale) = mutator_scales(state.mutator);
    let depth = 1.0 + 0.2 * f64::from(chapter.index);
    let gold_reward = (50.0 * tuning.gold_bonus * depth * reward_scale) as u32;
    let exp_reward = (100.0 * tuning.exp_bonus * depth * reward_scale) as u32;

    if let Some(ch) = state.chapter_mut() {
        ch.completed = true;
    }
    state.chapters_completed.push(chapter.id.clone());
    state.player.gold += gold_reward;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::GoldGained { amount: gold_reward, reason: "chapter_completed".into() },
    );
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::ChapterCompleted {
            chapter: chapter.id.clone(),
            chapter_index: chapter.index,
            chapter_type: chapter.chapter_type,
            enemies_defeated: chapter.enemies_defeated,
            gold_reward,
            exp_reward,
        },
    );
    grant_experience(state, exp_reward, at, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::tests::test_state;
    use gd_types::Mutator;

    fn fallen_enemy(is_boss: bool) -> EnemyState {
        EnemyState {
            id: "feature_gremlin".into(),
            name: "Feature: widget".into(),
            kind: CommitKind::Feat,
            commit_hash: "abc1234".into(),
            current_hp: 0,
            max_hp: 30,
            attack: 5,
            defense: 1,
            block: 0,
            statuses: Vec::new(),
            intent: None,
            gold_reward: 12,
            exp_reward: 0,
            is_boss,
        }
    }

    #[test]
    fn battle_gold_uses_type_boss_and_chapter_bonuses() {
        let registry = gd_data::registry::build_default_registry();
        let base = test_state(&registry, 42);

        let gold_for = |enemy: &EnemyState, mutator: Mutator| {
            let mut state = base.clone();
            state.mutator = mutator;
            let mut events = Vec::new();
            offer_battle_rewards(&mut state, &registry, enemy, 0, 1, 0, &mut events);
            state.player.gold
        };

        // Same (chapter, node) tuple draws the same jitter, so the boss
        // payout is the plain payout tripled.
        let plain = gold_for(&fallen_enemy(false), Mutator::None);
        let boss = gold_for(&fallen_enemy(true), Mutator::None);
        assert!(plain > 0);
        assert!(boss > plain * 2);

        // Hard mutators shrink the payout.
        let hard = gold_for(&fallen_enemy(false), Mutator::Hard);
        assert!(hard < plain);
    }

    #[test]
    fn bias_accumulates_through_the_tag_map() {
        let mut bias = ArchetypeBias::default();
        record_pick_tags(&mut bias, &["debug".into(), "offensive".into(), "basic".into()]);
        assert!((bias.debug - 2.0 * BIAS_PER_TAG).abs() < 1e-12);
        assert!(bias.test.abs() < 1e-12);
        assert_eq!(bias.tag_counts.get("basic").copied(), Some(1));
    }

    #[test]
    fn bias_factor_favours_the_dominant_archetype() {
        let mut bias = ArchetypeBias::default();
        record_pick_tags(&mut bias, &["test".into(), "test".into(), "defensive".into()]);
        let test_factor = bias_factor(&bias, &["defensive".into()]);
        let debug_factor = bias_factor(&bias, &["debug".into()]);
        assert!(test_factor > debug_factor);
        let neutral = bias_factor(&bias, &["basic".into()]);
        assert!((neutral - 1.0).abs() < 1e-12);
    }
}
