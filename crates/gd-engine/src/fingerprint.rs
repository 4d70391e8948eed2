//! Run identity — repository fingerprints, run fingerprints, and
//! daily-challenge seeds.
//!
//! All hashing is FNV-1a so fingerprints are identical across
//! platforms and engine builds with no dependency on hasher seeds.

use gd_types::{CommitRecord, Mutator, PackId};

const FNV64_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01B3;
const FNV32_OFFSET: u32 = 0x811C_9DC5;
const FNV32_PRIME: u32 = 0x0100_0193;

pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = FNV64_OFFSET;
    for &b in bytes {
        h = (h ^ u64::from(b)).wrapping_mul(FNV64_PRIME);
    }
    h
}

pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h = FNV32_OFFSET;
    for &b in bytes {
        h = (h ^ u32::from(b)).wrapping_mul(FNV32_PRIME);
    }
    h
}

/// Identity of the commit history a run was built from.
pub fn repo_fingerprint(commits: &[CommitRecord]) -> Box<str> {
    let mut h = FNV64_OFFSET;
    for commit in commits {
        for &b in commit.hash.as_bytes() {
            h = (h ^ u64::from(b)).wrapping_mul(FNV64_PRIME);
        }
        h = (h ^ commits.len() as u64).wrapping_mul(FNV64_PRIME);
    }
    format!("repo-{h:016x}").into()
}

/// The shareable run fingerprint: repository identity, seed, mutator,
/// sorted pack IDs, and (for daily challenges) the date.
pub fn run_fingerprint(
    repo: &str,
    seed: u32,
    mutator: Mutator,
    pack_ids: &[PackId],
    daily_date: Option<&str>,
) -> Box<str> {
    let mut material = String::new();
    material.push_str(repo);
    material.push('\n');
    material.push_str(&seed.to_string());
    material.push('\n');
    material.push_str(mutator.key());
    for pack in pack_ids {
        material.push('\n');
        material.push_str(pack.as_str());
    }
    if let Some(date) = daily_date {
        material.push('\n');
        material.push_str(date);
    }
    format!("run-{:016x}", fnv1a64(material.as_bytes())).into()
}

/// Seed for a daily challenge date (ISO `YYYY-MM-DD`).
pub fn daily_seed(date_iso: &str) -> u32 {
    fnv1a32(format!("daily:{date_iso}").as_bytes())
}
