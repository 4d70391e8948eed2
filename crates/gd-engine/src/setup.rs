//! Run creation — initial state construction from a parsed commit
//! history and a built registry.

use gd_data::characters::DEFAULT_CHARACTER;
use gd_data::ContentRegistry;
use gd_types::event::EventKind;
use gd_types::rng::RngState;
use gd_types::state::*;
use gd_types::{
    CharacterId, CommitRecord, EngineError, GameEvent, Mutator, SAVE_SCHEMA_VERSION,
};

use crate::action_pipeline::emit;
use crate::chapters::partition_chapters;
use crate::fingerprint::{repo_fingerprint, run_fingerprint};
use crate::nodes::generate_route;

/// Commit histories beyond this are refused at load.
pub const DEFAULT_COMMIT_CAP: usize = 2000;

/// Everything needed to start a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: u32,
    pub mutator: Mutator,
    pub character: Option<CharacterId>,
    /// Daily-challenge date (ISO); folded into the run fingerprint.
    pub daily_date: Option<Box<str>>,
    pub commit_cap: usize,
}

impl RunConfig {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            mutator: Mutator::None,
            character: None,
            daily_date: None,
            commit_cap: DEFAULT_COMMIT_CAP,
        }
    }
}

/// Create a run: partition chapters, build the starter player, and lay
/// out the first chapter's route.
pub fn create_run(
    registry: &ContentRegistry,
    commits: Vec<CommitRecord>,
    config: &RunConfig,
    at: i64,
) -> Result<(GameState, Vec<GameEvent>), EngineError> {
    if commits.is_empty() {
        return Err(EngineError::repository("repository has no commits"));
    }
    if commits.len() > config.commit_cap {
        return Err(EngineError::resource(format!(
            "commit history exceeds the cap ({} > {})",
            commits.len(),
            config.commit_cap
        )));
    }

    let character_id =
        config.character.clone().unwrap_or_else(|| CharacterId::from(DEFAULT_CHARACTER));
    let Some(character_def) = registry.character(&character_id) else {
        return Err(EngineError::content(format!("unknown character '{character_id}'")));
    };
    let Some(archetype) = registry.archetype(&character_def.archetype) else {
        return Err(EngineError::content(format!(
            "unknown archetype '{}'",
            character_def.archetype
        )));
    };

    let stats = StatSet {
        hp: Stat::new(character_def.stats.hp),
        mp: Stat::new(character_def.stats.mp),
        attack: Stat::new(character_def.stats.attack),
        defense: Stat::new(character_def.stats.defense),
        speed: Stat::new(character_def.stats.speed),
        critical: Stat::new(character_def.stats.critical),
        evasion: Stat::new(character_def.stats.evasion),
        luck: Stat::new(character_def.stats.luck),
    };
    let character = CharacterState {
        character: character_id,
        level: 1,
        current_hp: stats.hp.value().max(0) as u32,
        current_mp: stats.mp.value().max(0) as u32,
        experience: 0,
        stats,
        block: 0,
        statuses: Vec::new(),
    };

    let player = PlayerState {
        character,
        gold: 0,
        relics: archetype.starter_relics.clone(),
        deck: archetype.starter_cards.iter().map(|c| CardInstance::new(c.clone())).collect(),
        energy: EnergyState::new(BASE_ENERGY),
        bias: ArchetypeBias::default(),
        archetype: archetype.id.clone(),
        flags: PlayerFlags::empty(),
    };

    let chapters = partition_chapters(&commits, registry, config.seed);
    let repo = repo_fingerprint(&commits);
    let run_id = run_fingerprint(
        &repo,
        config.seed,
        config.mutator,
        &registry.pack_ids,
        config.daily_date.as_deref(),
    );

    let mut state = GameState {
        run_id: run_id.clone(),
        seed: config.seed,
        schema_version: SAVE_SCHEMA_VERSION,
        repo_fingerprint: repo,
        mutator: config.mutator,
        difficulty: config.mutator.key().into(),
        player,
        total_commits: commits.len() as u32,
        commits,
        chapters,
        current_chapter: 0,
        commit_cursor: 0,
        encounter: None,
        in_combat: false,
        pending_reward: None,
        enemies_defeated: Vec::new(),
        chapters_completed: Vec::new(),
        route: RouteState::default(),
        is_game_over: false,
        is_victory: false,
        next_event_id: 0,
        rng: RngState::new(config.seed),
        pack_ids: registry.pack_ids.clone(),
    };

    let mut events = Vec::new();
    emit(
        &mut state.next_event_id,
        &mut events,
        at,
        EventKind::GameStarted {
            run_id,
            seed: config.seed,
            total_commits: state.total_commits,
            chapter_count: state.chapters.len() as u32,
        },
    );
    open_chapter(&mut state, registry, at, &mut events);

    Ok((state, events))
}

/// Lay out the current chapter's route and announce it.
pub(crate) fn open_chapter(
    state: &mut GameState,
    registry: &ContentRegistry,
    at: i64,
    out: &mut Vec<GameEvent>,
) {
    let Some(chapter) = state.chapter().cloned() else { return };
    let tuning = registry.chapter_tuning(chapter.chapter_type);
    let has_events = !registry.events.is_empty();
    let nodes = generate_route(state.seed, &chapter, tuning, has_events);

    state
        .route
        .materialised
        .insert(chapter.id.as_str().into(), nodes.iter().map(|n| n.kind).collect());
    state.route.nodes = nodes;
    state.route.cursor = None;
    state.commit_cursor = chapter.start_index;

    emit(
        &mut state.next_event_id,
        out,
        at,
        EventKind::ChapterStarted {
            chapter: chapter.id.clone(),
            chapter_index: chapter.index,
            chapter_type: chapter.chapter_type,
            enemy_count: chapter.commit_count,
            has_boss: chapter.has_boss,
        },
    );
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use gd_data::registry::build_default_registry;

    pub fn synthetic_commits(n: usize) -> Vec<CommitRecord> {
        (0..n)
            .map(|i| {
                let message = if i % 2 == 0 {
                    format!("feat: synthetic feature {i}")
                } else {
                    format!("fix: synthetic bug {i}")
                };
                CommitRecord {
                    hash: format!("{i:040x}").into(),
                    short_hash: format!("{i:07x}").into(),
                    message: message.into(),
                    author: "dev".into(),
                    timestamp: 1_700_000_000 + i as i64 * 3600,
                    additions: 30 + (i as u32 * 7) % 90,
                    deletions: 5 + (i as u32 * 3) % 40,
                    is_merge: false,
                    is_revert: false,
                }
            })
            .collect()
    }

    /// A ready-to-play state over ten synthetic commits.
    pub fn test_state(registry: &ContentRegistry, seed: u32) -> GameState {
        let (state, _) =
            create_run(registry, synthetic_commits(10), &RunConfig::new(seed), 0).unwrap();
        state
    }

    #[test]
    fn run_creation_builds_starter_player() {
        let registry = build_default_registry();
        let (state, events) =
            create_run(&registry, synthetic_commits(10), &RunConfig::new(42), 0).unwrap();
        assert_eq!(state.player.deck.len(), 6);
        assert_eq!(state.player.relics.len(), 2);
        assert_eq!(state.player.character.current_hp, 100);
        assert!(!state.chapters.is_empty());
        assert!(!state.route.nodes.is_empty());
        assert!(matches!(events[0].kind, EventKind::GameStarted { .. }));
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::ChapterStarted { .. })));
    }

    #[test]
    fn empty_repository_is_a_repository_error() {
        let registry = build_default_registry();
        let err = create_run(&registry, Vec::new(), &RunConfig::new(42), 0).unwrap_err();
        assert_eq!(err.kind, gd_types::ErrorKind::Repository);
    }

    #[test]
    fn commit_cap_is_a_resource_error() {
        let registry = build_default_registry();
        let mut config = RunConfig::new(42);
        config.commit_cap = 5;
        let err = create_run(&registry, synthetic_commits(6), &config, 0).unwrap_err();
        assert_eq!(err.kind, gd_types::ErrorKind::ResourceLimit);
    }

    #[test]
    fn same_seed_same_run_id() {
        let registry = build_default_registry();
        let (a, _) = create_run(&registry, synthetic_commits(10), &RunConfig::new(42), 0).unwrap();
        let (b, _) = create_run(&registry, synthetic_commits(10), &RunConfig::new(42), 5).unwrap();
        assert_eq!(a.run_id, b.run_id);
        let (c, _) = create_run(&registry, synthetic_commits(10), &RunConfig::new(43), 0).unwrap();
        assert_ne!(a.run_id, c.run_id);
    }
}
