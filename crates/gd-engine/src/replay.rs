//! Replay — reproduce a run from its save document.
//!
//! Persisting (seed, pack IDs, mutator, ordered action log, content
//! surface) is enough to regenerate the full event stream; the
//! timestamps ride in the action log, so the replayed stream is
//! byte-equivalent under the same engine version.

use gd_data::ContentRegistry;
use gd_types::{EngineError, GameEvent};
use gd_types::state::GameState;

use crate::action_pipeline::Engine;
use crate::save::SaveDocument;
use crate::setup::{create_run, RunConfig};

/// Re-run a save's action log from scratch. Returns the final state
/// and the complete event stream.
pub fn replay(
    registry: &ContentRegistry,
    doc: &SaveDocument,
) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    let mut sorted_packs = registry.pack_ids.clone();
    sorted_packs.sort();
    if sorted_packs != doc.content_pack_ids {
        return Err(EngineError::content(
            "replay requires the content packs the run was recorded with",
        ));
    }

    let config = RunConfig {
        seed: doc.seed,
        mutator: doc.mutator,
        character: Some(doc.state.player.character.character.clone()),
        daily_date: doc.daily_date.clone(),
        commit_cap: doc.state.commits.len().max(crate::setup::DEFAULT_COMMIT_CAP),
    };
    let (mut state, mut events) =
        create_run(registry, doc.state.commits.clone(), &config, doc.created_at)?;

    if state.run_id != doc.run_id {
        return Err(EngineError::save_schema(format!(
            "run fingerprint mismatch: save says {}, rebuild says {}",
            doc.run_id, state.run_id
        )));
    }

    for record in &doc.action_log {
        let (next, mut batch) = Engine::apply(state, registry, record);
        state = next;
        events.append(&mut batch);
    }
    Ok((state, events))
}

/// Replay and check the result against the saved materialised state.
pub fn verify_replay(registry: &ContentRegistry, doc: &SaveDocument) -> Result<bool, EngineError> {
    let (state, _) = replay(registry, doc)?;
    Ok(state == doc.state && state.run_id == doc.run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::save_document;
    use crate::setup::tests::{synthetic_commits, test_state};
    use gd_data::registry::build_default_registry;
    use gd_types::action::{Action, ActionRecord};

    fn drive(registry: &ContentRegistry, seed: u32, actions: &[Action]) -> (GameState, Vec<ActionRecord>) {
        let mut state = test_state(registry, seed);
        let mut log = Vec::new();
        for (i, action) in actions.iter().enumerate() {
            let record = ActionRecord { action: action.clone(), at: 1_700_000_000 + i as i64 };
            let (next, _) = Engine::apply(state, registry, &record);
            state = next;
            log.push(record);
        }
        (state, log)
    }

    #[test]
    fn replay_reproduces_state_and_fingerprint() {
        let registry = build_default_registry();
        let actions = vec![Action::AdvanceNode, Action::StartCombat, Action::EndTurn];
        let (state, log) = drive(&registry, 42, &actions);
        let doc = save_document(&state, &log, 0, None);
        assert!(verify_replay(&registry, &doc).unwrap());
    }

    #[test]
    fn replay_event_stream_is_stable() {
        let registry = build_default_registry();
        let actions = vec![Action::AdvanceNode, Action::StartCombat, Action::EndTurn];
        let (state, log) = drive(&registry, 42, &actions);
        let doc = save_document(&state, &log, 0, None);
        let (_, first) = replay(&registry, &doc).unwrap();
        let (_, second) = replay(&registry, &doc).unwrap();
        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replay_rejects_a_different_pack_surface() {
        let registry = build_default_registry();
        let (state, log) = drive(&registry, 42, &[Action::AdvanceNode]);
        let mut doc = save_document(&state, &log, 0, None);
        doc.content_pack_ids.push(gd_types::PackId::from("phantom_pack"));
        assert!(replay(&registry, &doc).is_err());
    }

    #[test]
    fn replay_rechecks_the_run_fingerprint() {
        let registry = build_default_registry();
        let (state, log) = drive(&registry, 42, &[Action::AdvanceNode]);
        let mut doc = save_document(&state, &log, 0, None);
        doc.run_id = "run-0000000000000000".into();
        let err = replay(&registry, &doc).unwrap_err();
        assert_eq!(err.kind, gd_types::ErrorKind::SaveSchema);
    }

    #[test]
    fn commit_material_rides_in_the_save() {
        // A save is self-contained: replay does not need the repository.
        let registry = build_default_registry();
        let (state, log) = drive(&registry, 7, &[Action::AdvanceNode]);
        let doc = save_document(&state, &log, 0, None);
        assert_eq!(doc.state.commits, synthetic_commits(10));
        assert!(verify_replay(&registry, &doc).unwrap());
    }
}
