//! The turn-based battle engine.
//!
//! A battle runs phases `player` -> `enemy` -> back, with `resolution`
//! closing it out. The enemy's next intent is always declared before
//! the player acts. Damage resolves in a fixed order: attack stat,
//! weak on the attacker, vulnerable on the target, block, defense,
//! then a floor of 1 unless the source explicitly allows 0.

use gd_data::enemies::EnemyDefinition;
use gd_data::ContentRegistry;
use gd_types::effect::{CardEffect, EffectTarget, Intent, RelicOp};
use gd_types::event::EventKind;
use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::*;
use gd_types::{
    AiPattern, BattleOutcome, EngineError, GameEvent, IntentKind, RelicHook, StatusKind, TurnPhase,
};

use crate::action_pipeline::emit;
use crate::deck::{discard_hand, draw_cards, take_from_hand};
use crate::rewards;
use crate::status::{
    apply_status, burn_tick, consume_charge, decrement_durations, stacks_of,
    THORNS_DAMAGE_PER_STACK,
};

/// Flat damage/block bonus per card upgrade level.
const UPGRADE_BONUS: u32 = 3;
/// Block granted by the defend action on top of the defense stat.
const DEFEND_BASE_BLOCK: u32 = 5;
/// Enemies only consider their escape intents below this HP fraction.
const ENEMY_ESCAPE_HP_FRACTION: f64 = 0.25;
/// Probability an enemy escape intent succeeds.
const ENEMY_ESCAPE_CHANCE: f64 = 0.5;

// =============================================================================
// Damage resolution
// =============================================================================

/// Inputs to one attack resolution.
#[derive(Debug, Clone, Copy)]
pub struct AttackInput {
    pub value: u32,
    pub attacker_attack: u32,
    pub attacker_weak: u32,
    pub target_vulnerable: u32,
    pub target_block: u32,
    pub target_defense: u32,
    pub true_damage: bool,
    pub allow_zero: bool,
}

/// Outcome of one attack resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    pub hp_loss: u32,
    pub blocked: u32,
}

/// The fixed damage pipeline.
pub fn resolve_attack(input: AttackInput) -> AttackOutcome {
    let mut raw = input.value + input.attacker_attack;
    if input.attacker_weak > 0 {
        let pct = 100u32.saturating_sub(25 * input.attacker_weak);
        raw = raw * pct / 100;
    }
    if input.target_vulnerable > 0 {
        raw = raw * (100 + 25 * input.target_vulnerable) / 100;
    }
    let blocked = raw.min(input.target_block);
    let mut after = raw - blocked;
    if !input.true_damage {
        after = after.saturating_sub(input.target_defense);
    }
    if after == 0 && !input.allow_zero {
        after = 1;
    }
    AttackOutcome { hp_loss: after, blocked }
}

// =============================================================================
// Battle flow
// =============================================================================

enum Flow {
    Continue,
    Ended,
}

fn illegal(message: &str) -> EngineError {
    EngineError::illegal(message)
}

fn require_player_phase(state: &GameState) -> Result<(), EngineError> {
    match state.battle() {
        Some(b) if state.in_combat && b.phase == TurnPhase::Player => Ok(()),
        Some(_) => Err(illegal("not the player phase")),
        None => Err(illegal("not in a battle")),
    }
}

fn take_battle(state: &mut GameState) -> Option<Box<BattleState>> {
    match state.encounter.take() {
        Some(Encounter::Battle(b)) => Some(b),
        other => {
            state.encounter = other;
            None
        }
    }
}

/// Effective max energy: base + passive relic bonuses - tech_debt.
fn effective_max_energy(state: &GameState, registry: &ContentRegistry) -> u32 {
    let mut max = BASE_ENERGY;
    for relic_id in &state.player.relics {
        if let Some(relic) = registry.relic(relic_id) {
            for effect in &relic.effects {
                if effect.hook == RelicHook::Passive {
                    if let RelicOp::MaxEnergy { amount } = effect.op {
                        max += amount;
                    }
                }
            }
        }
    }
    let debt = stacks_of(&state.player.character.statuses, StatusKind::TechDebt);
    max.saturating_sub(debt).max(MIN_MAX_ENERGY)
}

fn has_retain_block(state: &GameState, registry: &ContentRegistry) -> bool {
    state.player.relics.iter().any(|relic_id| {
        registry.relic(relic_id).is_some_and(|relic| {
            relic
                .effects
                .iter()
                .any(|e| e.hook == RelicHook::Passive && matches!(e.op, RelicOp::RetainBlock))
        })
    })
}

// =============================================================================
// Entry
// =============================================================================

/// Begin the battle at the current combat node.
pub(crate) fn begin_battle(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    if state.in_combat {
        return Err(illegal("already in combat"));
    }
    let Some(mut battle) = take_battle(state) else {
        return Err(illegal("no battle at this node"));
    };

    if has_retain_block(state, registry) {
        state.player.flags.insert(PlayerFlags::RETAIN_BLOCK);
    } else {
        state.player.flags.remove(PlayerFlags::RETAIN_BLOCK);
    }

    // Fresh piles from the run deck, shuffled by the turn-0 stream.
    battle.deck = DeckState::default();
    battle.deck.draw = state.player.deck.clone();
    battle.rng.shuffle(&mut battle.deck.draw);

    state.in_combat = true;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::BattleStarted {
            enemy: battle.enemy.id.clone(),
            enemy_name: battle.enemy.name.clone(),
            enemy_hp: battle.enemy.current_hp,
            enemy_max_hp: battle.enemy.max_hp,
            is_boss: battle.enemy.is_boss,
        },
    );

    // First intent is declared before the player ever acts.
    declare_intent(state, registry, &mut battle, at, out);

    battle.turn = 1;
    battle.rng = RngState::stream(
        state.seed,
        StreamDomain::BattleCombat,
        &[battle.chapter_index, battle.node_position, battle.turn],
    );
    match player_turn_start(state, registry, &mut battle, at, out) {
        Flow::Continue => {
            state.encounter = Some(Encounter::Battle(battle));
            Ok(())
        }
        Flow::Ended => Ok(()),
    }
}

// =============================================================================
// Turn starts
// =============================================================================

fn player_turn_start(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    battle.phase = TurnPhase::Player;

    let bonus_energy = consume_charge(&mut state.player.character.statuses);
    if !state.player.flags.contains(PlayerFlags::RETAIN_BLOCK) {
        state.player.character.block = 0;
    }
    state.player.flags.remove(PlayerFlags::DEFENDING);

    let max = effective_max_energy(state, registry);
    state.player.energy = EnergyState { max, current: max + bonus_energy, gained_this_turn: 0 };

    // Relic turn-start hooks fire in relic-list order.
    let mut extra_draw = 0u32;
    let relic_ids = state.player.relics.clone();
    for relic_id in &relic_ids {
        let Some(relic) = registry.relic(relic_id) else { continue };
        for effect in &relic.effects {
            if effect.hook != RelicHook::OnTurnStart {
                continue;
            }
            match &effect.op {
                RelicOp::GainEnergy { amount } => {
                    state.player.energy.current += amount;
                    state.player.energy.gained_this_turn += amount;
                }
                RelicOp::ExtraDraw { count } => extra_draw += count,
                RelicOp::GainBlock { amount } => state.player.character.block += amount,
                RelicOp::StatusSelf { status, stacks } => {
                    let applied =
                        apply_status(&mut state.player.character.statuses, registry, status, *stacks, None);
                    emit(
                        &mut state.next_event_id,
                        out,
                        at,
                        EventKind::StatusApplied {
                            target: "player".into(),
                            status: status.clone(),
                            stacks: applied,
                        },
                    );
                }
                RelicOp::StatusEnemy { status, stacks } => {
                    let applied =
                        apply_status(&mut battle.enemy.statuses, registry, status, *stacks, None);
                    emit(
                        &mut state.next_event_id,
                        out,
                        at,
                        EventKind::StatusApplied {
                            target: "enemy".into(),
                            status: status.clone(),
                            stacks: applied,
                        },
                    );
                }
                _ => {}
            }
        }
    }

    // Player statuses tick in insertion order.
    let focus = stacks_of(&state.player.character.statuses, StatusKind::Focus);
    let bug = stacks_of(&state.player.character.statuses, StatusKind::Bug);
    if bug > 0 {
        let lost = state.player.character.lose_hp(bug);
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::DamageDealt {
                source: "bug".into(),
                target: "player".into(),
                amount: lost,
                blocked: 0,
            },
        );
        if state.player.character.is_dead() {
            return resolve_defeat(state, battle, at, out);
        }
    }

    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::TurnStarted { turn: battle.turn, phase: TurnPhase::Player },
    );

    let want = (STARTING_HAND_SIZE as u32 + extra_draw + focus).saturating_sub(bug).max(1);
    let result = draw_cards(&mut battle.deck, &mut battle.rng, want);
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::CardsDrawn { count: result.drawn, reshuffled: result.reshuffled },
    );

    Flow::Continue
}

// =============================================================================
// Player actions
// =============================================================================

/// Play the card at `hand_index`.
pub(crate) fn play_card(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
    hand_index: usize,
) -> Result<(), EngineError> {
    require_player_phase(state)?;
    let Some(mut battle) = take_battle(state) else {
        return Err(illegal("not in a battle"));
    };

    let result = play_card_inner(state, registry, &mut battle, at, out, hand_index);
    match result {
        Ok(Flow::Continue) => {
            state.encounter = Some(Encounter::Battle(battle));
            Ok(())
        }
        Ok(Flow::Ended) => Ok(()),
        Err(err) => {
            state.encounter = Some(Encounter::Battle(battle));
            Err(err)
        }
    }
}

fn play_card_inner(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
    hand_index: usize,
) -> Result<Flow, EngineError> {
    let Some(instance) = battle.deck.hand.get(hand_index).cloned() else {
        return Err(illegal("no card at that hand index"));
    };
    let Some(card) = registry.card(&instance.card).cloned() else {
        return Err(illegal(&format!("unknown card '{}'", instance.card)));
    };
    if state.player.energy.current < card.cost {
        return Err(illegal("insufficient energy"));
    }

    state.player.energy.current -= card.cost;
    let instance = take_from_hand(&mut battle.deck, hand_index).expect("checked index");
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::CardPlayed { card: card.id.clone(), cost: card.cost },
    );

    let upgrade_bonus = u32::from(instance.upgrade) * UPGRADE_BONUS;
    let mut exhausts = instance.flags.contains(CardFlags::EXHAUST);

    for effect in &card.effects {
        match effect {
            CardEffect::Damage { target: EffectTarget::Enemy, value } => {
                if !battle.enemy.is_alive() {
                    continue;
                }
                let outcome = resolve_attack(AttackInput {
                    value: value + upgrade_bonus,
                    attacker_attack: state.player.character.stats.attack.value().max(0) as u32,
                    attacker_weak: stacks_of(&state.player.character.statuses, StatusKind::Weak),
                    target_vulnerable: stacks_of(&battle.enemy.statuses, StatusKind::Vulnerable),
                    target_block: battle.enemy.block,
                    target_defense: battle.enemy.defense,
                    true_damage: false,
                    allow_zero: false,
                });
                battle.enemy.block -= outcome.blocked;
                battle.enemy.current_hp = battle.enemy.current_hp.saturating_sub(outcome.hp_loss);
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::DamageDealt {
                        source: "player".into(),
                        target: "enemy".into(),
                        amount: outcome.hp_loss,
                        blocked: outcome.blocked,
                    },
                );
                // Enemy thorns bite back on direct attacks.
                let thorns = stacks_of(&battle.enemy.statuses, StatusKind::Thorns)
                    * THORNS_DAMAGE_PER_STACK;
                if thorns > 0 {
                    let lost = state.player.character.lose_hp(thorns);
                    emit(
                        &mut state.next_event_id,
                        out,
                        at,
                        EventKind::DamageDealt {
                            source: "thorns".into(),
                            target: "player".into(),
                            amount: lost,
                            blocked: 0,
                        },
                    );
                }
            }
            CardEffect::Damage { target: EffectTarget::Owner, value } => {
                let lost = state.player.character.lose_hp(*value);
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::DamageDealt {
                        source: "player".into(),
                        target: "player".into(),
                        amount: lost,
                        blocked: 0,
                    },
                );
            }
            CardEffect::Block { target, value } => {
                let amount = value + upgrade_bonus;
                match target {
                    EffectTarget::Owner => state.player.character.block += amount,
                    EffectTarget::Enemy => battle.enemy.block += amount,
                }
            }
            CardEffect::Draw { count } => {
                let result = draw_cards(&mut battle.deck, &mut battle.rng, *count);
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::CardsDrawn { count: result.drawn, reshuffled: result.reshuffled },
                );
            }
            CardEffect::GainEnergy { amount } => {
                state.player.energy.current += amount;
                state.player.energy.gained_this_turn += amount;
            }
            CardEffect::ApplyStatus { target, status, stacks } => {
                let (list, label) = match target {
                    EffectTarget::Owner => (&mut state.player.character.statuses, "player"),
                    EffectTarget::Enemy => (&mut battle.enemy.statuses, "enemy"),
                };
                let applied = apply_status(list, registry, status, *stacks, None);
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::StatusApplied {
                        target: label.into(),
                        status: status.clone(),
                        stacks: applied,
                    },
                );
            }
            CardEffect::Heal { target, amount } => {
                let healed = match target {
                    EffectTarget::Owner => state.player.character.heal(*amount),
                    EffectTarget::Enemy => {
                        let missing = battle.enemy.max_hp - battle.enemy.current_hp;
                        let healed = (*amount).min(missing);
                        battle.enemy.current_hp += healed;
                        healed
                    }
                };
                let label = match target {
                    EffectTarget::Owner => "player",
                    EffectTarget::Enemy => "enemy",
                };
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::Healed { target: label.into(), amount: healed },
                );
            }
            CardEffect::ExhaustSelf => exhausts = true,
        }
    }

    if exhausts {
        battle.deck.exhaust.push(instance);
    } else {
        battle.deck.discard.push(instance);
    }

    // Relic on-card-played hooks.
    let relic_ids = state.player.relics.clone();
    for relic_id in &relic_ids {
        let Some(relic) = registry.relic(relic_id) else { continue };
        for effect in &relic.effects {
            if effect.hook == RelicHook::OnCardPlayed {
                if let RelicOp::GainBlock { amount } = effect.op {
                    state.player.character.block += amount;
                }
            }
        }
    }

    if !battle.enemy.is_alive() {
        return Ok(resolve_victory(state, registry, battle, at, out));
    }
    if state.player.character.is_dead() {
        return Ok(resolve_defeat(state, battle, at, out));
    }
    Ok(Flow::Continue)
}

/// Brace for the hit: gain block, then the enemy acts.
pub(crate) fn defend(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    require_player_phase(state)?;
    let Some(mut battle) = take_battle(state) else {
        return Err(illegal("not in a battle"));
    };
    state.player.flags.insert(PlayerFlags::DEFENDING);
    state.player.character.block +=
        DEFEND_BASE_BLOCK + state.player.character.stats.defense.value().max(0) as u32;
    match finish_player_turn(state, registry, &mut battle, at, out) {
        Flow::Continue => {
            state.encounter = Some(Encounter::Battle(battle));
            Ok(())
        }
        Flow::Ended => Ok(()),
    }
}

/// End the player turn: discard the hand, then the enemy acts.
pub(crate) fn end_turn(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    require_player_phase(state)?;
    let Some(mut battle) = take_battle(state) else {
        return Err(illegal("not in a battle"));
    };
    match finish_player_turn(state, registry, &mut battle, at, out) {
        Flow::Continue => {
            state.encounter = Some(Encounter::Battle(battle));
            Ok(())
        }
        Flow::Ended => Ok(()),
    }
}

/// Attempt to flee a non-boss battle.
pub(crate) fn escape(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    require_player_phase(state)?;
    if state.battle().is_some_and(|b| b.enemy.is_boss) {
        return Err(illegal("cannot escape a boss battle"));
    }
    let Some(mut battle) = take_battle(state) else {
        return Err(illegal("not in a battle"));
    };

    let escaped = battle.rng.chance(battle.escape_probability);
    if escaped {
        battle.phase = TurnPhase::Resolution;
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::BattleEnded { result: BattleOutcome::Escaped },
        );
        state.in_combat = false;
        metrics::counter!("gd_battles_resolved_total").increment(1);
        return Ok(());
    }

    emit(&mut state.next_event_id, out, at, EventKind::EscapeFailed {});
    match finish_player_turn(state, registry, &mut battle, at, out) {
        Flow::Continue => {
            state.encounter = Some(Encounter::Battle(battle));
            Ok(())
        }
        Flow::Ended => Ok(()),
    }
}

// =============================================================================
// Turn end and the enemy turn
// =============================================================================

fn finish_player_turn(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    // Player turn end: burn, then duration decay.
    let burn = burn_tick(&mut state.player.character.statuses);
    if burn > 0 {
        let lost = state.player.character.lose_hp(burn);
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::DamageDealt {
                source: "burn".into(),
                target: "player".into(),
                amount: lost,
                blocked: 0,
            },
        );
    }
    for expired in decrement_durations(&mut state.player.character.statuses) {
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::StatusRemoved { target: "player".into(), status: expired },
        );
    }
    discard_hand(&mut battle.deck);
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::TurnEnded { turn: battle.turn, phase: TurnPhase::Player },
    );
    if state.player.character.is_dead() {
        return resolve_defeat(state, battle, at, out);
    }

    run_enemy_turn(state, registry, battle, at, out)
}

fn run_enemy_turn(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    battle.phase = TurnPhase::Enemy;

    // Enemy turn start: bug damage.
    let bug = stacks_of(&battle.enemy.statuses, StatusKind::Bug);
    if bug > 0 {
        battle.enemy.current_hp = battle.enemy.current_hp.saturating_sub(bug);
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::DamageDealt {
                source: "bug".into(),
                target: "enemy".into(),
                amount: bug,
                blocked: 0,
            },
        );
        if !battle.enemy.is_alive() {
            return resolve_victory(state, registry, battle, at, out);
        }
    }

    let intent = battle.enemy.intent.take().unwrap_or_else(|| Intent::attack(battle.enemy.attack as i32));
    match intent.kind {
        IntentKind::Attack => {
            if let Flow::Ended = enemy_attack(state, registry, battle, &intent, at, out) {
                return Flow::Ended;
            }
        }
        IntentKind::Defend => {
            battle.enemy.block += intent.value.max(0) as u32;
        }
        IntentKind::Buff => {
            if let Some(status) = &intent.status {
                let applied =
                    apply_status(&mut battle.enemy.statuses, registry, status, intent.status_stacks, None);
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::StatusApplied {
                        target: "enemy".into(),
                        status: status.clone(),
                        stacks: applied,
                    },
                );
            } else {
                battle.enemy.attack += intent.value.max(0) as u32;
            }
        }
        IntentKind::Debuff => {
            if let Some(status) = &intent.status {
                let applied = apply_status(
                    &mut state.player.character.statuses,
                    registry,
                    status,
                    intent.status_stacks,
                    Some(3),
                );
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::StatusApplied {
                        target: "player".into(),
                        status: status.clone(),
                        stacks: applied,
                    },
                );
            }
        }
        IntentKind::Charge => {
            let id = StatusKind::Charge.id();
            let applied = apply_status(&mut battle.enemy.statuses, registry, &id, 1, None);
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::StatusApplied { target: "enemy".into(), status: id, stacks: applied },
            );
        }
        IntentKind::Escape => {
            if battle.rng.chance(ENEMY_ESCAPE_CHANCE) {
                battle.phase = TurnPhase::Resolution;
                emit(
                    &mut state.next_event_id,
                    out,
                    at,
                    EventKind::BattleEnded { result: BattleOutcome::EnemyFled },
                );
                state.in_combat = false;
                metrics::counter!("gd_battles_resolved_total").increment(1);
                return Flow::Ended;
            }
        }
    }

    // Enemy turn end: burn, then duration decay.
    let burn = burn_tick(&mut battle.enemy.statuses);
    if burn > 0 {
        battle.enemy.current_hp = battle.enemy.current_hp.saturating_sub(burn);
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::DamageDealt {
                source: "burn".into(),
                target: "enemy".into(),
                amount: burn,
                blocked: 0,
            },
        );
    }
    for expired in decrement_durations(&mut battle.enemy.statuses) {
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::StatusRemoved { target: "enemy".into(), status: expired },
        );
    }
    if !battle.enemy.is_alive() {
        return resolve_victory(state, registry, battle, at, out);
    }
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::TurnEnded { turn: battle.turn, phase: TurnPhase::Enemy },
    );

    // Declare the next intent, then open the next player turn.
    declare_intent(state, registry, battle, at, out);
    battle.turn += 1;
    battle.rng = RngState::stream(
        state.seed,
        StreamDomain::BattleCombat,
        &[battle.chapter_index, battle.node_position, battle.turn],
    );
    player_turn_start(state, registry, battle, at, out)
}

fn enemy_attack(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    intent: &Intent,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    let outcome = resolve_attack(AttackInput {
        value: intent.value.max(0) as u32,
        attacker_attack: 0,
        attacker_weak: stacks_of(&battle.enemy.statuses, StatusKind::Weak),
        target_vulnerable: stacks_of(&state.player.character.statuses, StatusKind::Vulnerable),
        target_block: state.player.character.block,
        target_defense: state.player.character.stats.defense.value().max(0) as u32,
        true_damage: false,
        allow_zero: false,
    });
    state.player.character.block -= outcome.blocked;
    let lost = state.player.character.lose_hp(outcome.hp_loss);
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::DamageDealt {
            source: "enemy".into(),
            target: "player".into(),
            amount: lost,
            blocked: outcome.blocked,
        },
    );
    if state.player.character.is_dead() {
        return resolve_defeat(state, battle, at, out);
    }

    // Thorns and on-damage-taken relics reflect back.
    let mut reflect =
        stacks_of(&state.player.character.statuses, StatusKind::Thorns) * THORNS_DAMAGE_PER_STACK;
    for relic_id in &state.player.relics {
        if let Some(relic) = registry.relic(relic_id) {
            for effect in &relic.effects {
                if effect.hook == RelicHook::OnDamageTaken {
                    if let RelicOp::ReflectDamage { amount } = effect.op {
                        reflect += amount;
                    }
                }
            }
        }
    }
    if reflect > 0 {
        battle.enemy.current_hp = battle.enemy.current_hp.saturating_sub(reflect);
        emit(
            &mut state.next_event_id,
            out,
            at,
            EventKind::DamageDealt {
                source: "thorns".into(),
                target: "enemy".into(),
                amount: reflect,
                blocked: 0,
            },
        );
        if !battle.enemy.is_alive() {
            return resolve_victory(state, registry, battle, at, out);
        }
    }
    Flow::Continue
}

// =============================================================================
// Intent selection
// =============================================================================

fn intent_for_kind(battle: &mut BattleState, kind: IntentKind) -> Intent {
    match kind {
        IntentKind::Attack => {
            let mut value = battle.enemy.attack;
            // Charge doubles the next attack and is spent on declaration.
            if stacks_of(&battle.enemy.statuses, StatusKind::Charge) > 0 {
                value *= 2;
                crate::status::remove_status(&mut battle.enemy.statuses, &StatusKind::Charge.id());
            }
            Intent::attack(value as i32)
        }
        IntentKind::Defend => Intent::defend((DEFEND_BASE_BLOCK + battle.enemy.defense) as i32),
        IntentKind::Buff => Intent { kind, value: 2, status: None, status_stacks: 0 },
        IntentKind::Debuff => Intent {
            kind,
            value: 1,
            status: Some(StatusKind::Weak.id()),
            status_stacks: 1,
        },
        IntentKind::Charge | IntentKind::Escape => {
            Intent { kind, value: 0, status: None, status_stacks: 0 }
        }
    }
}

fn pattern_weight(pattern: AiPattern, kind: IntentKind) -> f64 {
    match (pattern, kind) {
        (AiPattern::Aggressive, IntentKind::Attack) => 3.0,
        (AiPattern::Defensive, IntentKind::Defend) => 3.0,
        _ => 1.0,
    }
}

fn declare_intent(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) {
    let profile: Option<&EnemyDefinition> = registry.enemy(&battle.enemy.id);
    let (pattern, preference) = match profile {
        Some(p) => (p.ai_pattern, p.intent_preference.clone()),
        None => (AiPattern::Basic, vec![IntentKind::Attack]),
    };

    let desperate = f64::from(battle.enemy.current_hp)
        < f64::from(battle.enemy.max_hp) * ENEMY_ESCAPE_HP_FRACTION;
    let candidates: Vec<IntentKind> = preference
        .iter()
        .copied()
        .filter(|k| *k != IntentKind::Escape || (desperate && !battle.enemy.is_boss))
        .collect();
    let candidates = if candidates.is_empty() { vec![IntentKind::Attack] } else { candidates };

    let kind = if pattern == AiPattern::Cyclic {
        candidates[battle.turn as usize % candidates.len()]
    } else {
        let weights: Vec<f64> =
            candidates.iter().map(|k| pattern_weight(pattern, *k)).collect();
        let pick = battle.rng.weighted_index(&weights).unwrap_or(0);
        candidates[pick]
    };

    let intent = intent_for_kind(battle, kind);
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::EnemyIntentRevealed { intent: intent.clone() },
    );
    battle.enemy.intent = Some(intent);
}

// =============================================================================
// Resolution
// =============================================================================

fn resolve_victory(
    state: &mut GameState,
    registry: &ContentRegistry,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    battle.phase = TurnPhase::Resolution;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::BattleEnded { result: BattleOutcome::Victory },
    );
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::EnemyDefeated {
            enemy: battle.enemy.id.clone(),
            enemy_name: battle.enemy.name.clone(),
            exp_reward: battle.enemy.exp_reward,
            gold_reward: battle.enemy.gold_reward,
        },
    );

    state.enemies_defeated.push(battle.enemy.commit_hash.clone());
    if let Some(chapter) = state.chapter_mut() {
        chapter.enemies_defeated += 1;
    }

    rewards::grant_experience(state, battle.enemy.exp_reward, at, out);
    rewards::offer_battle_rewards(state, registry, &battle.enemy, battle.chapter_index, battle.node_position, at, out);

    state.in_combat = false;
    metrics::counter!("gd_battles_resolved_total").increment(1);
    Flow::Ended
}

fn resolve_defeat(
    state: &mut GameState,
    battle: &mut BattleState,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Flow {
    battle.phase = TurnPhase::Resolution;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::BattleEnded { result: BattleOutcome::Defeat },
    );
    state.in_combat = false;
    state.is_game_over = true;
    state.is_victory = false;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::GameEnded {
            result: "defeat".into(),
            enemies_defeated: state.enemies_defeated.len() as u32,
        },
    );
    metrics::counter!("gd_battles_resolved_total").increment(1);
    Flow::Ended
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulnerable_math_matches_the_book() {
        // damage 20, vulnerable 2, defense 5: floor(20 * 1.5) - 5 = 25.
        let outcome = resolve_attack(AttackInput {
            value: 20,
            attacker_attack: 0,
            attacker_weak: 0,
            target_vulnerable: 2,
            target_block: 0,
            target_defense: 5,
            true_damage: false,
            allow_zero: false,
        });
        assert_eq!(outcome, AttackOutcome { hp_loss: 25, blocked: 0 });
    }

    #[test]
    fn block_absorbs_before_defense() {
        let outcome = resolve_attack(AttackInput {
            value: 10,
            attacker_attack: 0,
            attacker_weak: 0,
            target_vulnerable: 0,
            target_block: 4,
            target_defense: 3,
            true_damage: false,
            allow_zero: false,
        });
        assert_eq!(outcome.blocked, 4);
        assert_eq!(outcome.hp_loss, 3); // 10 - 4 - 3
    }

    #[test]
    fn weak_reduces_before_vulnerable_amplifies() {
        // raw 20, weak 1: 15; vulnerable 2: floor(15 * 1.5) = 22.
        let outcome = resolve_attack(AttackInput {
            value: 20,
            attacker_attack: 0,
            attacker_weak: 1,
            target_vulnerable: 2,
            target_block: 0,
            target_defense: 0,
            true_damage: false,
            allow_zero: false,
        });
        assert_eq!(outcome.hp_loss, 22);
    }

    #[test]
    fn true_damage_skips_defense() {
        let outcome = resolve_attack(AttackInput {
            value: 8,
            attacker_attack: 0,
            attacker_weak: 0,
            target_vulnerable: 0,
            target_block: 0,
            target_defense: 100,
            true_damage: true,
            allow_zero: false,
        });
        assert_eq!(outcome.hp_loss, 8);
    }

    #[test]
    fn minimum_one_damage_unless_allowed_zero() {
        let base = AttackInput {
            value: 2,
            attacker_attack: 0,
            attacker_weak: 0,
            target_vulnerable: 0,
            target_block: 10,
            target_defense: 0,
            true_damage: false,
            allow_zero: false,
        };
        assert_eq!(resolve_attack(base).hp_loss, 1);
        assert_eq!(resolve_attack(AttackInput { allow_zero: true, ..base }).hp_loss, 0);
    }

    #[test]
    fn heavy_weak_floors_at_zero_raw() {
        let outcome = resolve_attack(AttackInput {
            value: 10,
            attacker_attack: 0,
            attacker_weak: 5,
            target_vulnerable: 0,
            target_block: 0,
            target_defense: 0,
            true_damage: false,
            allow_zero: true,
        });
        assert_eq!(outcome.hp_loss, 0);
    }
}
