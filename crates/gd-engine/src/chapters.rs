//! Commit classification, chapter partitioning, and enemy
//! parameterisation.
//!
//! Commits are walked oldest-first. The first two commits of a run are
//! always `initial`; afterwards keyword dispatch wins, with a
//! position-based bucket as the fallback. A chapter closes when the
//! incoming type differs and the running chapter met its minimum, or
//! when it hit its maximum; integration and legacy chapters may close
//! after a single commit.

use gd_data::chapters::ChapterTuning;
use gd_data::ContentRegistry;
use gd_types::state::{ChapterState, EnemyState};
use gd_types::{ChapterId, ChapterType, CommitKind, CommitRecord, Mutator, NodeKind};

// =============================================================================
// Classification
// =============================================================================

/// Classify a commit for enemy parameterisation.
pub fn classify_commit(commit: &CommitRecord) -> CommitKind {
    let msg = commit.message.to_lowercase();
    if commit.merge_like() {
        CommitKind::Merge
    } else if commit.revert_like() {
        CommitKind::Revert
    } else if msg.starts_with("fix") || msg.starts_with("hotfix") || msg.contains(" bug") {
        CommitKind::Fix
    } else if msg.starts_with("feat") {
        CommitKind::Feat
    } else if msg.starts_with("docs") {
        CommitKind::Docs
    } else if msg.starts_with("refactor") {
        CommitKind::Refactor
    } else if msg.starts_with("test") {
        CommitKind::Test
    } else if msg.starts_with("chore") {
        CommitKind::Chore
    } else {
        CommitKind::General
    }
}

/// Chapter type for the commit at `index` of `total`.
pub fn chapter_type_for(index: usize, total: usize, message: &str) -> ChapterType {
    // First two commits are always the opening chapter.
    if index < 2 {
        return ChapterType::Initial;
    }

    let msg = message.to_lowercase();
    if msg.contains("merge") || msg.contains("integration") {
        return ChapterType::Integration;
    }
    if msg.contains("release") || msg.contains("version") || msg.contains("tag") {
        return ChapterType::Legacy;
    }
    if msg.starts_with("fix") || msg.contains(" bug") || msg.contains("hotfix") {
        return ChapterType::Fix;
    }
    if msg.starts_with("feat") {
        return ChapterType::Feature;
    }

    // Position bucket for unclassified commits.
    let ratio = index as f64 / total as f64;
    if ratio < 0.4 {
        ChapterType::Feature
    } else if ratio < 0.7 {
        ChapterType::Fix
    } else {
        ChapterType::Legacy
    }
}

fn should_switch(current: ChapterType, incoming: ChapterType, count: u32, tuning: &ChapterTuning) -> bool {
    if current != incoming {
        let min = match current {
            ChapterType::Integration | ChapterType::Legacy => 1,
            _ => tuning.min_commits,
        };
        if count >= min {
            return true;
        }
    }
    count >= tuning.max_commits
}

// =============================================================================
// Partitioning
// =============================================================================

/// Partition commits into ordered chapters. `has_boss` per chapter is
/// rolled once from the chapter-partition stream against the type's
/// boss chance.
pub fn partition_chapters(
    commits: &[CommitRecord],
    registry: &ContentRegistry,
    seed: u32,
) -> Vec<ChapterState> {
    use gd_types::rng::{RngState, StreamDomain};

    if commits.is_empty() {
        return Vec::new();
    }

    let total = commits.len();
    let mut chapters: Vec<(ChapterType, u32, u32)> = Vec::new(); // (type, start, count)
    let mut current = chapter_type_for(0, total, &commits[0].message);
    let mut start = 0u32;
    let mut count = 0u32;

    for (i, commit) in commits.iter().enumerate() {
        let incoming = chapter_type_for(i, total, &commit.message);
        let tuning = registry.chapter_tuning(current);
        if count > 0 && should_switch(current, incoming, count, tuning) {
            chapters.push((current, start, count));
            current = incoming;
            start = i as u32;
            count = 1;
        } else {
            count += 1;
        }
    }
    chapters.push((current, start, count));

    let mut roll = RngState::stream(seed, StreamDomain::ChapterPartition, &[]);
    chapters
        .into_iter()
        .enumerate()
        .map(|(index, (chapter_type, start_index, commit_count))| {
            let tuning = registry.chapter_tuning(chapter_type);
            let has_boss = tuning.boss_chance > 0.0 && roll.chance(tuning.boss_chance);
            ChapterState {
                id: ChapterId::from_index(index as u32),
                index: index as u32,
                chapter_type,
                start_index,
                commit_count,
                enemies_defeated: 0,
                completed: false,
                has_boss,
            }
        })
        .collect()
}

// =============================================================================
// Enemy parameterisation
// =============================================================================

/// Per-commit-kind stat modifiers: (hp, atk, def, reward).
fn kind_modifiers(kind: CommitKind) -> (f64, f64, f64, f64) {
    match kind {
        CommitKind::Feat | CommitKind::General => (1.0, 1.2, 1.0, 1.2),
        CommitKind::Fix => (0.8, 1.5, 0.8, 1.5),
        CommitKind::Docs => (0.5, 0.3, 0.5, 0.5),
        CommitKind::Refactor => (1.2, 0.8, 1.5, 1.0),
        CommitKind::Test => (0.7, 0.6, 1.2, 0.8),
        CommitKind::Chore => (0.6, 0.5, 0.6, 0.6),
        CommitKind::Merge => (2.0, 1.5, 1.5, 2.0),
        CommitKind::Revert => (1.5, 1.8, 1.0, 1.8),
    }
}

/// Mutator scaling: (hp, atk, rewards).
pub fn mutator_scales(mutator: Mutator) -> (f64, f64, f64) {
    match mutator {
        Mutator::None => (1.0, 1.0, 1.0),
        Mutator::Hard => (1.35, 1.25, 0.8),
    }
}

/// Node-kind scaling on top of everything else: (hp, atk, rewards).
fn node_scales(node_kind: NodeKind) -> (f64, f64, f64) {
    match node_kind {
        NodeKind::Elite => (1.5, 1.2, 1.5),
        NodeKind::Boss => (2.0, 1.5, 2.0),
        _ => (1.0, 1.0, 1.0),
    }
}

/// Build the enemy for a commit at a combat node.
pub fn build_enemy(
    commit: &CommitRecord,
    chapter: &ChapterState,
    node_kind: NodeKind,
    registry: &ContentRegistry,
    mutator: Mutator,
) -> EnemyState {
    let kind = classify_commit(commit);
    let profile = registry
        .enemy_for_kind(kind)
        .unwrap_or_else(|| registry.enemy_for_kind(CommitKind::General).expect("general profile"));

    let changes = commit.total_changes().max(1);
    let base_hp = (2 * changes).max(20) as f64;
    let base_atk = (changes / 5).max(5) as f64;
    let base_def = (commit.deletions / 10).max(1) as f64;

    let (hp_mod, atk_mod, def_mod, reward_mod) = kind_modifiers(kind);
    let depth = 1.0 + 0.1 * f64::from(chapter.index);
    let tuning = registry.chapter_tuning(chapter.chapter_type);
    let (mut_hp, mut_atk, mut_reward) = mutator_scales(mutator);
    let (node_hp, node_atk, node_reward) = node_scales(node_kind);

    let hp = (base_hp * hp_mod * depth * tuning.enemy_hp_multiplier * mut_hp * node_hp) as u32;
    let hp = hp.max(1);
    let attack =
        ((base_atk * atk_mod * depth * tuning.enemy_atk_multiplier * mut_atk * node_atk) as u32).max(1);
    let defense = (base_def * def_mod * depth) as u32;

    let exp_reward =
        (20.0 * reward_mod * depth * profile.exp_multiplier * mut_reward * node_reward) as u32;
    let gold_reward =
        (10.0 * reward_mod * depth * profile.gold_multiplier * mut_reward * node_reward) as u32;

    let is_boss = node_kind == NodeKind::Boss || profile.is_boss || commit.merge_like();

    EnemyState {
        id: profile.id.clone(),
        name: enemy_name(commit, kind),
        kind,
        commit_hash: commit.short_hash.clone(),
        current_hp: hp,
        max_hp: hp,
        attack,
        defense,
        block: 0,
        statuses: Vec::new(),
        intent: None,
        gold_reward,
        exp_reward,
        is_boss,
    }
}

/// Flavor name from the commit message.
fn enemy_name(commit: &CommitRecord, kind: CommitKind) -> Box<str> {
    fn trail(msg: &str, prefix: usize, cap: usize) -> String {
        msg[prefix..].trim().chars().take(cap).collect()
    }

    let msg: &str = &commit.message;
    match kind {
        CommitKind::Merge => "Merge Conflict".into(),
        CommitKind::Feat if msg.len() > 5 && msg.to_lowercase().starts_with("feat:") => {
            format!("Feature: {}", trail(msg, 5, 20)).into()
        }
        CommitKind::Fix if msg.len() > 4 && msg.to_lowercase().starts_with("fix:") => {
            format!("Bug: {}", trail(msg, 4, 20)).into()
        }
        CommitKind::Docs if msg.len() > 5 && msg.to_lowercase().starts_with("docs:") => {
            format!("Docs: {}", trail(msg, 5, 15)).into()
        }
        _ => {
            let short: String = msg.chars().take(25).collect();
            if short.is_empty() { "Unknown".into() } else { short.into() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gd_data::registry::build_default_registry;

    fn commit(message: &str, additions: u32, deletions: u32) -> CommitRecord {
        CommitRecord {
            hash: format!("{message:0<40}").into(),
            short_hash: "abcdef0".into(),
            message: message.into(),
            author: "dev".into(),
            timestamp: 0,
            additions,
            deletions,
            is_merge: false,
            is_revert: false,
        }
    }

    fn synthetic_history(n: usize) -> Vec<CommitRecord> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    commit(&format!("feat: thing {i}"), 40, 10)
                } else {
                    commit(&format!("fix: bug {i}"), 20, 5)
                }
            })
            .collect()
    }

    #[test]
    fn classification_prefers_keywords() {
        assert_eq!(classify_commit(&commit("feat: add x", 1, 1)), CommitKind::Feat);
        assert_eq!(classify_commit(&commit("fix: crash", 1, 1)), CommitKind::Fix);
        assert_eq!(classify_commit(&commit("docs: readme", 1, 1)), CommitKind::Docs);
        assert_eq!(classify_commit(&commit("Merge branch 'dev'", 1, 1)), CommitKind::Merge);
        assert_eq!(classify_commit(&commit("Revert \"feat: x\"", 1, 1)), CommitKind::Revert);
        assert_eq!(classify_commit(&commit("wip stuff", 1, 1)), CommitKind::General);
    }

    #[test]
    fn first_two_commits_are_initial() {
        assert_eq!(chapter_type_for(0, 10, "feat: x"), ChapterType::Initial);
        assert_eq!(chapter_type_for(1, 10, "Merge branch"), ChapterType::Initial);
        assert_eq!(chapter_type_for(2, 10, "Merge branch"), ChapterType::Integration);
    }

    #[test]
    fn position_buckets_for_plain_messages() {
        assert_eq!(chapter_type_for(3, 10, "wip"), ChapterType::Feature);
        assert_eq!(chapter_type_for(5, 10, "wip"), ChapterType::Fix);
        assert_eq!(chapter_type_for(8, 10, "wip"), ChapterType::Legacy);
    }

    #[test]
    fn partition_covers_every_commit_exactly_once() {
        let registry = build_default_registry();
        let commits = synthetic_history(40);
        let chapters = partition_chapters(&commits, &registry, 42);
        assert!(!chapters.is_empty());
        assert_eq!(chapters[0].start_index, 0);
        let mut next = 0;
        for ch in &chapters {
            assert_eq!(ch.start_index, next);
            assert!(ch.commit_count > 0);
            next += ch.commit_count;
        }
        assert_eq!(next as usize, commits.len());
    }

    #[test]
    fn partition_is_deterministic_per_seed() {
        let registry = build_default_registry();
        let commits = synthetic_history(25);
        let a = partition_chapters(&commits, &registry, 7);
        let b = partition_chapters(&commits, &registry, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_history_yields_no_chapters() {
        let registry = build_default_registry();
        assert!(partition_chapters(&[], &registry, 42).is_empty());
    }

    #[test]
    fn vulnerable_profile_numbers() {
        // 150 changes: hp = 300, atk = 30, def from deletions.
        let registry = build_default_registry();
        let chapter = ChapterState {
            id: ChapterId::from_index(0),
            index: 0,
            chapter_type: ChapterType::Feature,
            start_index: 0,
            commit_count: 1,
            enemies_defeated: 0,
            completed: false,
            has_boss: false,
        };
        let c = commit("feat: big", 120, 30);
        let enemy = build_enemy(&c, &chapter, NodeKind::Battle, &registry, Mutator::None);
        assert_eq!(enemy.max_hp, 300);
        assert_eq!(enemy.attack, 36); // 30 * 1.2 feat modifier
        assert_eq!(enemy.defense, 3);
        assert!(!enemy.is_boss);
    }

    #[test]
    fn hard_mutator_scales_up_stats_down_rewards() {
        let registry = build_default_registry();
        let chapter = ChapterState {
            id: ChapterId::from_index(0),
            index: 0,
            chapter_type: ChapterType::Feature,
            start_index: 0,
            commit_count: 1,
            enemies_defeated: 0,
            completed: false,
            has_boss: false,
        };
        let c = commit("feat: big", 120, 30);
        let normal = build_enemy(&c, &chapter, NodeKind::Battle, &registry, Mutator::None);
        let hard = build_enemy(&c, &chapter, NodeKind::Battle, &registry, Mutator::Hard);
        assert!(hard.max_hp > normal.max_hp);
        assert!(hard.attack > normal.attack);
        assert!(hard.gold_reward < normal.gold_reward);
        assert!(hard.exp_reward < normal.exp_reward);
    }

    #[test]
    fn boss_nodes_force_boss_enemies() {
        let registry = build_default_registry();
        let chapter = ChapterState {
            id: ChapterId::from_index(1),
            index: 1,
            chapter_type: ChapterType::Integration,
            start_index: 0,
            commit_count: 1,
            enemies_defeated: 0,
            completed: false,
            has_boss: true,
        };
        let c = commit("chore: tidy", 10, 2);
        let enemy = build_enemy(&c, &chapter, NodeKind::Boss, &registry, Mutator::None);
        assert!(enemy.is_boss);
    }
}
