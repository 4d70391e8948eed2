//! Node graph generation — one typed route per chapter.
//!
//! Pure over (seed, chapter, tuning, has_events): the only randomness
//! is the chapter-nodes stream, so identical inputs always produce the
//! identical route. Node count is `clamp(enemy_count + 2, 4, 20)`;
//! rest sits at a third of the route and shop at two thirds (chapters
//! shorter than six nodes carry neither), elites land on free interior
//! slots, and the final node is the boss whenever the chapter has one.

use gd_data::chapters::ChapterTuning;
use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::{ChapterState, RouteNode};
use gd_types::{NodeId, NodeKind, NodeTag};

const MIN_NODES: usize = 4;
const MAX_NODES: usize = 20;
const TREASURE_CHANCE: f64 = 0.25;
const EVENT_CHANCE: f64 = 0.18;

fn tags_for(kind: NodeKind) -> Vec<NodeTag> {
    match kind {
        NodeKind::Elite => vec![NodeTag::Risk],
        NodeKind::Boss => vec![NodeTag::Risk, NodeTag::Milestone],
        NodeKind::Rest => vec![NodeTag::Safe],
        NodeKind::Shop | NodeKind::Treasure => vec![NodeTag::Greed],
        NodeKind::Battle | NodeKind::Event => vec![],
    }
}

/// Generate the route for one chapter.
pub fn generate_route(
    seed: u32,
    chapter: &ChapterState,
    tuning: &ChapterTuning,
    has_events: bool,
) -> Vec<RouteNode> {
    let enemy_count = chapter.commit_count as usize;
    let mut rng = RngState::stream(seed, StreamDomain::ChapterNodes, &[chapter.index]);

    // Zero-commit chapters degenerate to at most one event node.
    if enemy_count == 0 {
        if !has_events {
            return Vec::new();
        }
        return vec![RouteNode {
            id: NodeId::from_position(chapter.index, 0),
            kind: NodeKind::Event,
            position: 0,
            tags: tags_for(NodeKind::Event),
            commit_index: None,
        }];
    }

    let count = (enemy_count + 2).clamp(MIN_NODES, MAX_NODES);
    let mut kinds: Vec<Option<NodeKind>> = vec![None; count];

    // Slot 0 is always a plain battle; the last slot is the boss.
    kinds[0] = Some(NodeKind::Battle);
    if chapter.has_boss {
        kinds[count - 1] = Some(NodeKind::Boss);
    }

    // Rest and shop at even intervals, only on routes long enough to
    // keep battles in the majority.
    if count >= 6 {
        let rest_pos = count / 3;
        if kinds[rest_pos].is_none() {
            kinds[rest_pos] = Some(NodeKind::Rest);
        }
        if tuning.shop_enabled {
            let shop_pos = 2 * count / 3;
            if kinds[shop_pos].is_none() {
                kinds[shop_pos] = Some(NodeKind::Shop);
            }
        }
    }

    // Elites: one for small chapters, two for larger ones.
    let elite_budget = if enemy_count >= 8 { 2 } else { 1 };
    for _ in 0..elite_budget {
        let free: Vec<usize> =
            (1..count - 1).filter(|&i| kinds[i].is_none()).collect();
        match rng.random_index(free.len()) {
            Some(pick) => kinds[free[pick]] = Some(NodeKind::Elite),
            None => break,
        }
    }

    // Occasional treasure.
    if rng.chance(TREASURE_CHANCE) {
        let free: Vec<usize> = (1..count - 1).filter(|&i| kinds[i].is_none()).collect();
        if let Some(pick) = rng.random_index(free.len()) {
            kinds[free[pick]] = Some(NodeKind::Treasure);
        }
    }

    // Events convert leftover interior slots.
    if has_events {
        for slot in kinds.iter_mut().take(count - 1).skip(1) {
            if slot.is_none() && rng.chance(EVENT_CHANCE) {
                *slot = Some(NodeKind::Event);
            }
        }
    }

    let kinds: Vec<NodeKind> = kinds.into_iter().map(|k| k.unwrap_or(NodeKind::Battle)).collect();

    // Evenly spread combat nodes over the chapter's commit slice.
    let combat_positions: Vec<usize> =
        (0..count).filter(|&i| kinds[i].is_combat()).collect();
    let combat_total = combat_positions.len();

    let mut nodes = Vec::with_capacity(count);
    let mut combat_seen = 0usize;
    for (position, kind) in kinds.into_iter().enumerate() {
        let commit_index = if kind.is_combat() {
            let index = representative_commit(combat_seen, combat_total, enemy_count);
            combat_seen += 1;
            Some(index)
        } else {
            None
        };
        nodes.push(RouteNode {
            id: NodeId::from_position(chapter.index, position as u32),
            kind,
            position: position as u32,
            tags: tags_for(kind),
            commit_index,
        });
    }
    nodes
}

/// Chapter-local commit index for combat node `i` of `k`, over `n`
/// commits: `round(i * (n - 1) / (k - 1))`, with a single combat node
/// mapping to commit 0.
pub fn representative_commit(i: usize, k: usize, n: usize) -> u32 {
    if n == 0 || k <= 1 || i == 0 {
        return 0;
    }
    let num = i as f64 * (n - 1) as f64;
    let idx = (num / (k - 1) as f64).round() as usize;
    idx.min(n - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use gd_data::chapters::default_tuning;
    use gd_types::{ChapterId, ChapterType};

    fn chapter(index: u32, commit_count: u32, has_boss: bool) -> ChapterState {
        ChapterState {
            id: ChapterId::from_index(index),
            index,
            chapter_type: ChapterType::Feature,
            start_index: 0,
            commit_count,
            enemies_defeated: 0,
            completed: false,
            has_boss,
        }
    }

    #[test]
    fn route_is_deterministic() {
        let tuning = default_tuning(ChapterType::Feature);
        let ch = chapter(1, 12, true);
        let a = generate_route(42, &ch, &tuning, true);
        let b = generate_route(42, &ch, &tuning, true);
        assert_eq!(a, b);
    }

    #[test]
    fn last_node_is_boss_when_flagged() {
        let tuning = default_tuning(ChapterType::Feature);
        let ch = chapter(0, 10, true);
        let route = generate_route(7, &ch, &tuning, true);
        assert_eq!(route.last().unwrap().kind, NodeKind::Boss);
    }

    #[test]
    fn battle_is_the_majority_kind() {
        let tuning = default_tuning(ChapterType::Feature);
        for seed in [1u32, 42, 99, 1234] {
            let ch = chapter(2, 14, true);
            let route = generate_route(seed, &ch, &tuning, true);
            let combat =
                route.iter().filter(|n| n.kind == NodeKind::Battle).count();
            for kind in [NodeKind::Elite, NodeKind::Event, NodeKind::Shop, NodeKind::Rest] {
                let other = route.iter().filter(|n| n.kind == kind).count();
                assert!(combat > other, "seed {seed}: {kind:?} outnumbers battle");
            }
        }
    }

    #[test]
    fn elite_budget_scales_with_chapter_size() {
        let tuning = default_tuning(ChapterType::Feature);
        for seed in 0u32..20 {
            let small = generate_route(seed, &chapter(0, 5, false), &tuning, false);
            assert!(small.iter().filter(|n| n.kind == NodeKind::Elite).count() <= 1);
            let large = generate_route(seed, &chapter(0, 16, false), &tuning, false);
            assert!(large.iter().filter(|n| n.kind == NodeKind::Elite).count() <= 2);
        }
    }

    #[test]
    fn node_count_tracks_enemy_count() {
        let tuning = default_tuning(ChapterType::Feature);
        assert_eq!(generate_route(1, &chapter(0, 7, true), &tuning, false).len(), 9);
        assert_eq!(generate_route(1, &chapter(0, 1, true), &tuning, false).len(), 4);
        assert_eq!(generate_route(1, &chapter(0, 30, true), &tuning, false).len(), 20);
    }

    #[test]
    fn events_only_when_enabled() {
        let tuning = default_tuning(ChapterType::Feature);
        for seed in 0u32..20 {
            let route = generate_route(seed, &chapter(0, 12, true), &tuning, false);
            assert!(route.iter().all(|n| n.kind != NodeKind::Event), "seed {seed}");
        }
    }

    #[test]
    fn zero_commit_chapter_degenerates() {
        let tuning = default_tuning(ChapterType::Feature);
        let no_events = generate_route(3, &chapter(0, 0, false), &tuning, false);
        assert!(no_events.is_empty());
        let with_events = generate_route(3, &chapter(0, 0, false), &tuning, true);
        assert_eq!(with_events.len(), 1);
        assert_eq!(with_events[0].kind, NodeKind::Event);
    }

    #[test]
    fn representative_commit_spreads_evenly() {
        // Scenario F: 7 commits, 3 combat nodes -> indices 0, 3, 6.
        assert_eq!(representative_commit(0, 3, 7), 0);
        assert_eq!(representative_commit(1, 3, 7), 3);
        assert_eq!(representative_commit(2, 3, 7), 6);
        // Single combat node maps to the first commit.
        assert_eq!(representative_commit(0, 1, 9), 0);
    }

    #[test]
    fn combat_nodes_carry_commit_indices() {
        let tuning = default_tuning(ChapterType::Feature);
        let route = generate_route(42, &chapter(0, 9, true), &tuning, true);
        for node in &route {
            assert_eq!(node.commit_index.is_some(), node.kind.is_combat(), "{:?}", node.kind);
            if let Some(ci) = node.commit_index {
                assert!(ci < 9);
            }
        }
    }
}
