//! The action pipeline — `Engine::apply(state, action) -> (state, events)`.
//!
//! One dispatch function routes every action to its handler. Handlers
//! validate before they mutate; any failure returns the input state
//! untouched plus exactly one `error` event. The event list for one
//! action is totally ordered and emitted atomically.

use gd_data::ContentRegistry;
use gd_types::action::{Action, ActionRecord};
use gd_types::effect::EventOpcode;
use gd_types::event::EventKind;
use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::*;
use gd_types::{EngineError, GameEvent, NodeKind, RelicTier, RestOption};

use crate::battle;
use crate::event_effects::{apply_event_choice, select_event_for_node};
use crate::rewards;
use crate::setup::open_chapter;
use crate::shop;

/// Append an event, assigning the next per-run event ID.
pub(crate) fn emit(next_id: &mut u64, out: &mut Vec<GameEvent>, at: i64, kind: EventKind) {
    out.push(GameEvent { event_id: *next_id, at, kind });
    *next_id += 1;
}

/// The engine facade. Stateless; everything lives in `GameState`.
pub struct Engine;

impl Engine {
    /// Apply one action. On success the returned state reflects the
    /// transition; on an illegal action the input state is returned
    /// unchanged with a single `error` event (whose ID does not
    /// advance the counter).
    pub fn apply(
        state: GameState,
        registry: &ContentRegistry,
        record: &ActionRecord,
    ) -> (GameState, Vec<GameEvent>) {
        metrics::counter!("gd_actions_total").increment(1);

        let mut working = state.clone();
        let mut events = Vec::new();
        match dispatch(&mut working, registry, &record.action, record.at, &mut events) {
            Ok(()) => {
                metrics::counter!("gd_events_emitted_total").increment(events.len() as u64);
                (working, events)
            }
            Err(err) => {
                let error_event = GameEvent {
                    event_id: state.next_event_id,
                    at: record.at,
                    kind: EventKind::Error {
                        kind: err.kind.code().into(),
                        message: err.message.clone(),
                    },
                };
                (state, vec![error_event])
            }
        }
    }
}

fn dispatch(
    state: &mut GameState,
    registry: &ContentRegistry,
    action: &Action,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    if state.is_game_over {
        return Err(EngineError::illegal("the run is over"));
    }
    match action {
        Action::AdvanceNode => advance_node(state, registry, at, out),
        Action::StartCombat => battle::begin_battle(state, registry, at, out),
        Action::PlayCard { hand_index } => battle::play_card(state, registry, at, out, *hand_index),
        Action::Defend => battle::defend(state, registry, at, out),
        Action::EndTurn => battle::end_turn(state, registry, at, out),
        Action::Escape => battle::escape(state, registry, at, out),
        Action::EventChoice { choice_index } => event_choice(state, registry, at, out, *choice_index),
        Action::ShopBuy { offer_id } => shop_buy(state, registry, at, out, offer_id),
        Action::ShopSkip => shop_skip(state, at, out),
        Action::RestChoice { option } => rest_choice(state, at, out, *option),
        Action::PickReward { pick } => rewards::apply_reward_pick(state, registry, pick, at, out),
    }
}

// =============================================================================
// Route traversal
// =============================================================================

fn advance_node(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    if state.in_combat {
        return Err(EngineError::illegal("cannot advance during combat"));
    }
    if state.encounter.is_some() {
        return Err(EngineError::illegal("current node is unresolved"));
    }
    if state.pending_reward.is_some() {
        return Err(EngineError::illegal("a reward is waiting to be picked"));
    }
    if state.chapter().is_none() {
        return Err(EngineError::illegal("no chapter to advance in"));
    }

    let next = match state.route.cursor {
        None => 0,
        Some(cursor) => cursor + 1,
    };

    if next as usize >= state.route.nodes.len() {
        // The route is exhausted: close the chapter and open the next.
        rewards::complete_chapter(state, registry, at, out);
        state.current_chapter += 1;
        if state.chapter().is_none() {
            state.is_game_over = true;
            state.is_victory = true;
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::GameEnded {
                    result: "victory".into(),
                    enemies_defeated: state.enemies_defeated.len() as u32,
                },
            );
        } else {
            open_chapter(state, registry, at, out);
        }
        return Ok(());
    }

    state.route.cursor = Some(next);
    let node = state.route.nodes[next as usize].clone();
    state.route.visited.push(node.id.clone());
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::NodeEntered { node: node.id.clone(), position: node.position },
    );

    let forced = state.route.pending_battle.take();
    let combat_kind = match &forced {
        Some(kind) if kind.as_ref() == "elite" => Some(NodeKind::Elite),
        Some(_) => Some(NodeKind::Battle),
        None if node.kind.is_combat() => Some(node.kind),
        None => None,
    };

    if let Some(kind) = combat_kind {
        return enter_combat_node(state, registry, &node, kind);
    }

    match node.kind {
        NodeKind::Event => {
            if let Some(event_id) = select_event_for_node(state, registry, &node) {
                state.encounter = Some(Encounter::Event(EventEncounter { event: event_id }));
            }
            Ok(())
        }
        NodeKind::Shop => {
            let chapter_index = state.chapter().map_or(0, |c| c.index);
            let offers = shop::build_offers(state.seed, chapter_index, node.position);
            let offer_ids = offers.iter().map(|o| o.id.clone()).collect();
            state.encounter = Some(Encounter::Shop(ShopEncounter { offers, purchased: Vec::new() }));
            emit(&mut state.next_event_id, out, at, EventKind::ShopEntered { offer_ids });
            Ok(())
        }
        NodeKind::Rest => {
            state.encounter = Some(Encounter::Rest);
            Ok(())
        }
        NodeKind::Treasure => resolve_treasure(state, registry, &node, at, out),
        // Combat kinds were routed above.
        _ => Ok(()),
    }
}

fn enter_combat_node(
    state: &mut GameState,
    registry: &ContentRegistry,
    node: &gd_types::state::RouteNode,
    kind: NodeKind,
) -> Result<(), EngineError> {
    let chapter = state.chapter().cloned().expect("checked above");
    if chapter.commit_count == 0 {
        // Nothing to fight in a degenerate chapter.
        return Ok(());
    }
    let local = node.commit_index.unwrap_or(chapter.commit_count / 2);
    let global = chapter.start_index + local.min(chapter.commit_count - 1);
    state.commit_cursor = global;
    let Some(commit) = state.commits.get(global as usize).cloned() else {
        return Err(EngineError::new(
            gd_types::ErrorKind::Programmer,
            format!("commit cursor {global} out of range"),
        ));
    };

    let enemy = crate::chapters::build_enemy(&commit, &chapter, kind, registry, state.mutator);
    let battle = BattleState {
        enemy,
        deck: DeckState::default(),
        turn: 0,
        phase: gd_types::TurnPhase::Resolution,
        escape_probability: DEFAULT_ESCAPE_PROBABILITY,
        chapter_index: chapter.index,
        node_position: node.position,
        rng: RngState::stream(
            state.seed,
            StreamDomain::BattleCombat,
            &[chapter.index, node.position, 0],
        ),
    };
    state.encounter = Some(Encounter::Battle(Box::new(battle)));
    Ok(())
}

fn resolve_treasure(
    state: &mut GameState,
    registry: &ContentRegistry,
    node: &gd_types::state::RouteNode,
    at: i64,
    out: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    let chapter_index = state.chapter().map_or(0, |c| c.index);
    let mut rng =
        RngState::stream(state.seed, StreamDomain::Reward, &[chapter_index, node.position]);
    let jitter = 0.8 + 0.4 * rng.next_f64();
    let gold = ((30.0 + 10.0 * f64::from(chapter_index)) * jitter) as u32;
    state.player.gold += gold;
    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::GoldGained { amount: gold, reason: "treasure".into() },
    );

    if rng.chance(0.2) {
        let candidates: Vec<_> = registry
            .relics
            .values()
            .filter(|r| r.tier != RelicTier::Starter && !state.player.relics.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        if let Some(pick) = rng.random_index(candidates.len()) {
            let relic = candidates[pick].clone();
            state.player.relics.push(relic.clone());
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::ItemDropped { relic: relic.clone(), source: "treasure".into() },
            );
            emit(&mut state.next_event_id, out, at, EventKind::RelicAdded { relic });
        }
    }
    Ok(())
}

// =============================================================================
// Event nodes
// =============================================================================

fn event_choice(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
    choice_index: usize,
) -> Result<(), EngineError> {
    let Some(Encounter::Event(encounter)) = &state.encounter else {
        return Err(EngineError::illegal("no event to choose in"));
    };
    let event_id = encounter.event.clone();
    let Some(event) = registry.event(&event_id).cloned() else {
        return Err(EngineError::illegal(format!("unknown event '{event_id}'")));
    };
    let Some(choice) = event.choices.get(choice_index) else {
        return Err(EngineError::illegal("no event choice at that index"));
    };

    state.encounter = None;
    let result = apply_event_choice(state, registry, &choice.effects);

    // Deck and relic mutations surface as typed events, in application
    // order, so stream consumers never have to parse messages.
    for (op, applied) in choice.effects.iter().zip(&result.effects_applied) {
        if !applied.success {
            continue;
        }
        let kind = match op {
            EventOpcode::AddCard { card } => Some(EventKind::CardAdded { card: card.clone() }),
            EventOpcode::RemoveCard { card } => {
                Some(EventKind::CardRemoved { card: card.clone() })
            }
            EventOpcode::UpgradeCard { card } => {
                Some(EventKind::CardUpgraded { card: card.clone() })
            }
            EventOpcode::AddRelic { relic } => Some(EventKind::RelicAdded { relic: relic.clone() }),
            EventOpcode::RemoveRelic { relic } => {
                Some(EventKind::RelicRemoved { relic: relic.clone() })
            }
            _ => None,
        };
        if let Some(kind) = kind {
            emit(&mut state.next_event_id, out, at, kind);
        }
    }

    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::EventResolved {
            event: event_id,
            choice_id: choice.id.clone(),
            effects_applied: result.effects_applied,
            messages: result.messages,
        },
    );

    if state.player.character.is_dead() {
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
    }
    Ok(())
}

// =============================================================================
// Shop and rest nodes
// =============================================================================

fn shop_buy(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
    offer_id: &str,
) -> Result<(), EngineError> {
    let _ = registry;
    let Some(Encounter::Shop(shop_state)) = state.encounter.take() else {
        return Err(EngineError::illegal("no shop is open"));
    };
    let mut shop_state = shop_state;
    match shop::buy(state, &mut shop_state, offer_id) {
        Ok(cost) => {
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::ItemPurchased { offer_id: offer_id.into(), cost },
            );
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::GoldSpent { amount: cost, reason: "shop".into() },
            );
            // The shop stays open until the player skips out.
            state.encounter = Some(Encounter::Shop(shop_state));
            Ok(())
        }
        Err(err) => {
            state.encounter = Some(Encounter::Shop(shop_state));
            Err(err)
        }
    }
}

fn shop_skip(state: &mut GameState, at: i64, out: &mut Vec<GameEvent>) -> Result<(), EngineError> {
    let _ = (at, out);
    match state.encounter {
        Some(Encounter::Shop(_)) => {
            state.encounter = None;
            Ok(())
        }
        _ => Err(EngineError::illegal("no shop is open")),
    }
}

fn rest_choice(
    state: &mut GameState,
    at: i64,
    out: &mut Vec<GameEvent>,
    option: RestOption,
) -> Result<(), EngineError> {
    if !matches!(state.encounter, Some(Encounter::Rest)) {
        return Err(EngineError::illegal("not at a rest node"));
    }
    state.encounter = None;

    match option {
        RestOption::Heal => {
            let amount = ((state.player.character.max_hp() as f64 * 0.3) as u32).max(10);
            let healed = state.player.character.heal(amount);
            emit(
                &mut state.next_event_id,
                out,
                at,
                EventKind::Healed { target: "player".into(), amount: healed },
            );
        }
        RestOption::Focus => {
            let character = &mut state.player.character;
            character.stats.attack.base += 2;
            character.stats.hp.base += 5;
            character.current_hp = (character.current_hp + 5).min(character.max_hp());
        }
    }
    emit(&mut state.next_event_id, out, at, EventKind::RestTaken { option });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::tests::test_state;
    use gd_data::registry::build_default_registry;

    fn record(action: Action) -> ActionRecord {
        ActionRecord { action, at: 1_700_000_000 }
    }

    fn advance_until<F: Fn(&GameState) -> bool>(
        mut state: GameState,
        registry: &ContentRegistry,
        stop: F,
    ) -> GameState {
        for _ in 0..600 {
            if stop(&state) || state.is_game_over {
                break;
            }
            // Resolve whatever blocks the advance with cheap defaults.
            let action = if state.pending_reward.is_some() {
                Action::PickReward { pick: gd_types::action::RewardPick::Skip }
            } else {
                match &state.encounter {
                    Some(Encounter::Battle(_)) if !state.in_combat => Action::StartCombat,
                    Some(Encounter::Battle(_)) => Action::EndTurn,
                    Some(Encounter::Event(_)) => Action::EventChoice { choice_index: 0 },
                    Some(Encounter::Shop(_)) => Action::ShopSkip,
                    Some(Encounter::Rest) => Action::RestChoice { option: RestOption::Heal },
                    None => Action::AdvanceNode,
                }
            };
            let (next, _) = Engine::apply(state, registry, &record(action));
            state = next;
        }
        state
    }

    #[test]
    fn illegal_action_leaves_state_untouched_with_one_error() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let before = state.clone();
        let (after, events) = Engine::apply(state, &registry, &record(Action::EndTurn));
        assert_eq!(after, before);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());
    }

    #[test]
    fn advance_twice_without_resolving_fails_the_second_time() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        // Node 0 is always a battle.
        let (state, events) = Engine::apply(state, &registry, &record(Action::AdvanceNode));
        assert!(!events.iter().any(GameEvent::is_error));
        assert!(matches!(state.encounter, Some(Encounter::Battle(_))));
        let before = state.clone();
        let (state, events) = Engine::apply(state, &registry, &record(Action::AdvanceNode));
        assert_eq!(state, before);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());
        match &events[0].kind {
            EventKind::Error { kind, .. } => assert_eq!(kind.as_ref(), "illegal_action"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn start_combat_then_play_runs_a_full_battle() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let (state, _) = Engine::apply(state, &registry, &record(Action::AdvanceNode));
        let (state, events) = Engine::apply(state, &registry, &record(Action::StartCombat));
        assert!(state.in_combat);
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::BattleStarted { .. })));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::EnemyIntentRevealed { .. })));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::CardsDrawn { .. })));
        let hand_size = state.battle().unwrap().deck.hand.len();
        assert_eq!(hand_size, STARTING_HAND_SIZE);

        // Play the first affordable card.
        let battle = state.battle().unwrap();
        let index = battle
            .deck
            .hand
            .iter()
            .position(|c| {
                registry.card(&c.card).is_some_and(|d| d.cost <= state.player.energy.current)
            })
            .expect("an affordable starter card");
        let (state, events) =
            Engine::apply(state, &registry, &record(Action::PlayCard { hand_index: index }));
        assert!(!events.iter().any(GameEvent::is_error));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::CardPlayed { .. })));
        assert!(state.in_combat || state.pending_reward.is_some());
    }

    #[test]
    fn playing_out_of_phase_cards_is_rejected() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let (state, _) = Engine::apply(state, &registry, &record(Action::AdvanceNode));
        // Combat not started yet: play_card must fail cleanly.
        let before = state.clone();
        let (state, events) =
            Engine::apply(state, &registry, &record(Action::PlayCard { hand_index: 0 }));
        assert_eq!(state, before);
        assert!(events[0].is_error());
    }

    #[test]
    fn a_full_run_terminates() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let finished = advance_until(state, &registry, |s| s.is_game_over);
        assert!(finished.is_game_over);
    }

    #[test]
    fn chapter_completion_grants_rewards_and_opens_the_next() {
        let registry = build_default_registry();
        let state = test_state(&registry, 42);
        let gold_before = state.player.gold;
        let finished =
            advance_until(state, &registry, |s| !s.chapters_completed.is_empty());
        if !finished.is_game_over {
            assert!(!finished.chapters_completed.is_empty());
            assert!(finished.player.gold >= gold_before);
        }
    }

    #[test]
    fn event_choices_emit_typed_deck_events() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        state.encounter =
            Some(Encounter::Event(EventEncounter { event: "cursed_dependency".into() }));
        let (state, events) =
            Engine::apply(state, &registry, &record(Action::EventChoice { choice_index: 0 }));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::CardAdded { .. })));
        assert!(matches!(events.last().unwrap().kind, EventKind::EventResolved { .. }));
        assert!(state.player.deck.iter().any(|c| c.card.as_str() == "spaghetti_whip"));
    }

    #[test]
    fn event_choices_emit_upgrade_and_removal_events() {
        let registry = build_default_registry();
        let base = test_state(&registry, 42);

        // accept_patch upgrades a strike.
        let mut state = base.clone();
        state.encounter = Some(Encounter::Event(EventEncounter { event: "code_review".into() }));
        let (state, events) =
            Engine::apply(state, &registry, &record(Action::EventChoice { choice_index: 0 }));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::CardUpgraded { .. })));
        assert!(state
            .player
            .deck
            .iter()
            .any(|c| c.card.as_str() == "strike" && c.upgrade == 1));

        // rip_it_out removes one and pays out.
        let mut state = base.clone();
        state.encounter = Some(Encounter::Event(EventEncounter { event: "code_review".into() }));
        let strikes_before =
            state.player.deck.iter().filter(|c| c.card.as_str() == "strike").count();
        let (state, events) =
            Engine::apply(state, &registry, &record(Action::EventChoice { choice_index: 1 }));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::CardRemoved { .. })));
        let strikes_after =
            state.player.deck.iter().filter(|c| c.card.as_str() == "strike").count();
        assert_eq!(strikes_after, strikes_before - 1);
        assert_eq!(state.player.gold, 20);
    }

    #[test]
    fn actions_after_game_over_error() {
        let registry = build_default_registry();
        let mut state = test_state(&registry, 42);
        state.is_game_over = true;
        let (state, events) = Engine::apply(state, &registry, &record(Action::AdvanceNode));
        assert!(events[0].is_error());
        assert!(state.is_game_over);
    }
}
