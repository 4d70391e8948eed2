//! Seeded RNG — Mulberry32 with counter-based state and scoped streams.
//!
//! All randomness in the engine goes through `RngState`, which keeps
//! its entire state in two `u32`s so it serialises trivially and a
//! clone is an independent generator with identical future output.
//!
//! Higher layers never share one generator: every decision domain
//! derives its own stream with [`RngState::stream`], so reordering
//! unrelated work (UI polling, flavor-text calls) cannot perturb
//! gameplay. The mixing function is fixed: 32-bit FNV-1a over the
//! domain tag bytes, then each index folded in as
//! `h = rotl((h ^ index) * 16777619, 13)`, and the stream seed is
//! `root_seed ^ h` with the counter at 0. Equal (seed, domain, indices)
//! tuples produce equal streams on every platform.

use serde::{Deserialize, Serialize};

/// Decision domains for derived RNG streams.
///
/// Each domain's tag string is part of the stream contract — changing
/// a tag changes every run generated under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamDomain {
    /// Chapter partitioning (boss rolls). No indices.
    ChapterPartition,
    /// Node graph for one chapter. Indices: [chapter_index].
    ChapterNodes,
    /// Battle shuffles, rolls, and intents. Indices: [chapter_index, node_position, turn].
    BattleCombat,
    /// Post-battle reward bundle. Indices: [chapter_index, node_position].
    Reward,
    /// Event selection for an event node. Indices: [chapter_index, node_position].
    EventSelect,
    /// Shop offer selection. Indices: [chapter_index, node_position].
    ShopOffers,
}

impl StreamDomain {
    pub fn tag(self) -> &'static str {
        match self {
            Self::ChapterPartition => "chapter-partition",
            Self::ChapterNodes => "chapter-nodes",
            Self::BattleCombat => "battle-combat",
            Self::Reward => "reward",
            Self::EventSelect => "event-select",
            Self::ShopOffers => "shop-offers",
        }
    }
}

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// RNG state tracked in game state and battle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u32,
    pub counter: u32,
}

impl RngState {
    /// Create RNG with the given seed (counter starts at 0).
    pub fn new(seed: u32) -> Self {
        Self { seed, counter: 0 }
    }

    /// Derive the scoped stream for `(root_seed, domain, indices)`.
    pub fn stream(root_seed: u32, domain: StreamDomain, indices: &[u32]) -> Self {
        let mut h = FNV_OFFSET;
        for b in domain.tag().bytes() {
            h = (h ^ u32::from(b)).wrapping_mul(FNV_PRIME);
        }
        for &index in indices {
            h = ((h ^ index).wrapping_mul(FNV_PRIME)).rotate_left(13);
        }
        Self::new(root_seed ^ h)
    }

    /// Next random f64 in [0, 1). Advances counter by 1.
    pub fn next_f64(&mut self) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        mulberry32(self.seed.wrapping_add(self.counter))
    }

    /// Random u32 in [min, max] inclusive.
    pub fn next_int(&mut self, min: u32, max: u32) -> u32 {
        let value = self.next_f64();
        min + (value * (max - min + 1) as f64) as u32
    }

    /// Roll against a probability in [0, 1]. Always advances once.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Fisher-Yates shuffle, high index to low.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let value = self.next_f64();
            let j = (value * (i + 1) as f64) as usize;
            slice.swap(i, j);
        }
    }

    /// Pick a random index from `[0, len)`. Returns `None` if len is 0.
    pub fn random_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.next_int(0, len as u32 - 1) as usize)
    }

    /// Weighted choice over a parallel weight vector. Non-positive
    /// weights count as zero; returns `None` when nothing is pickable.
    /// Advances the counter exactly once whenever it returns `Some`.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next_f64() * total;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        // Float underflow lands on the last pickable slot.
        weights.iter().rposition(|w| *w > 0.0)
    }
}

/// Mulberry32 PRNG — fast, good distribution, seedable.
///
/// Takes a u32 input (seed + counter), returns a value in [0, 1).
/// Arithmetic is wrapping 32-bit throughout so the sequence is
/// identical on every platform.
fn mulberry32(input: u32) -> f64 {
    let mut t: i32 = input.wrapping_add(0x6D2B_79F5) as i32;

    let lhs = ((t as u32) ^ ((t as u32) >> 15)) as i32;
    let rhs = t | 1;
    t = lhs.wrapping_mul(rhs);

    let lhs2 = ((t as u32) ^ ((t as u32) >> 7)) as i32;
    let rhs2 = t | 61;
    let mul = lhs2.wrapping_mul(rhs2);
    t ^= t.wrapping_add(mul);

    let result = (t as u32) ^ ((t as u32) >> 14);
    f64::from(result) / 4_294_967_296.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Golden values for the Mulberry32 sequence under seed 42.
    const SEED_42_EXPECTED: [f64; 5] = [
        0.9998110907617956,
        0.8361802322324365,
        0.03719550580717623,
        0.060074036940932274,
        0.62949686544016,
    ];

    #[test]
    fn mulberry32_golden_seed_42() {
        let mut rng = RngState::new(42);
        for (i, &expected) in SEED_42_EXPECTED.iter().enumerate() {
            let actual = rng.next_f64();
            assert!(
                (actual - expected).abs() < 1e-15,
                "seed=42, index={i}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn clone_is_independent_with_identical_output() {
        let mut rng = RngState::new(7);
        rng.next_f64();
        let mut fork = rng;
        for _ in 0..50 {
            assert_eq!(rng.next_f64().to_bits(), fork.next_f64().to_bits());
        }
    }

    #[test]
    fn streams_are_stable_per_tuple() {
        let a = RngState::stream(42, StreamDomain::ChapterNodes, &[3]);
        let b = RngState::stream(42, StreamDomain::ChapterNodes, &[3]);
        assert_eq!(a, b);

        let other_index = RngState::stream(42, StreamDomain::ChapterNodes, &[4]);
        assert_ne!(a.seed, other_index.seed);

        let other_domain = RngState::stream(42, StreamDomain::Reward, &[3]);
        assert_ne!(a.seed, other_domain.seed);
    }

    #[test]
    fn stream_counter_starts_at_zero() {
        let s = RngState::stream(9, StreamDomain::BattleCombat, &[0, 1, 2]);
        assert_eq!(s.counter, 0);
    }

    #[test]
    fn shuffle_deterministic() {
        let mut a: Vec<u32> = (0..12).collect();
        let mut b = a.clone();
        RngState::new(42).shuffle(&mut a);
        RngState::new(42).shuffle(&mut b);
        assert_eq!(a, b);
        assert_ne!(a, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_empty_and_single_consume_nothing() {
        let mut rng = RngState::new(42);
        let mut empty: Vec<u32> = vec![];
        rng.shuffle(&mut empty);
        let mut single = vec![1u32];
        rng.shuffle(&mut single);
        assert_eq!(rng.counter, 0);
    }

    #[test]
    fn weighted_index_respects_zero_weights() {
        let mut rng = RngState::new(5);
        for _ in 0..100 {
            let picked = rng.weighted_index(&[0.0, 1.0, 0.0]).unwrap();
            assert_eq!(picked, 1);
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(rng.weighted_index(&[]), None);
    }

    #[test]
    fn weighted_index_advances_counter_once() {
        let mut rng = RngState::new(11);
        rng.weighted_index(&[1.0, 2.0, 3.0]);
        assert_eq!(rng.counter, 1);
    }

    proptest! {
        #[test]
        fn next_f64_in_unit_interval(seed: u32) {
            let mut rng = RngState::new(seed);
            for _ in 0..32 {
                let v = rng.next_f64();
                prop_assert!((0.0..1.0).contains(&v));
            }
        }

        #[test]
        fn next_int_in_range(seed: u32, lo in 0u32..100, span in 0u32..100) {
            let mut rng = RngState::new(seed);
            let hi = lo + span;
            for _ in 0..16 {
                let v = rng.next_int(lo, hi);
                prop_assert!((lo..=hi).contains(&v));
            }
        }

        #[test]
        fn shuffle_is_a_permutation(seed: u32, len in 0usize..24) {
            let mut items: Vec<usize> = (0..len).collect();
            RngState::new(seed).shuffle(&mut items);
            let mut sorted = items.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sorted, (0..len).collect::<Vec<_>>());
        }
    }
}
