//! Commit input model — what the repository reader hands the engine.
//!
//! The reader (a host concern) yields these oldest-first; the engine
//! never touches a repository itself.

use serde::{Deserialize, Serialize};

/// One commit as seen by the chapter partitioner and enemy builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: Box<str>,
    pub short_hash: Box<str>,
    pub message: Box<str>,
    pub author: Box<str>,
    /// Unix timestamp (seconds). Used for flavor only, never for rules.
    pub timestamp: i64,
    pub additions: u32,
    pub deletions: u32,
    pub is_merge: bool,
    pub is_revert: bool,
}

impl CommitRecord {
    pub fn total_changes(&self) -> u32 {
        self.additions + self.deletions
    }

    /// Whether the message marks a merge, by flag or by wording.
    pub fn merge_like(&self) -> bool {
        self.is_merge || self.message.to_lowercase().contains("merge")
    }

    /// Whether the message marks a revert, by flag or by wording.
    pub fn revert_like(&self) -> bool {
        self.is_revert || self.message.to_lowercase().starts_with("revert")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str, additions: u32, deletions: u32) -> CommitRecord {
        CommitRecord {
            hash: "deadbeef".into(),
            short_hash: "deadbee".into(),
            message: message.into(),
            author: "dev".into(),
            timestamp: 0,
            additions,
            deletions,
            is_merge: false,
            is_revert: false,
        }
    }

    #[test]
    fn total_changes_sums_both_sides() {
        assert_eq!(commit("feat: add parser", 120, 30).total_changes(), 150);
    }

    #[test]
    fn merge_detection_reads_the_message() {
        assert!(commit("Merge branch 'main'", 0, 0).merge_like());
        assert!(!commit("feat: merge-sort", 0, 0).revert_like());
        assert!(commit("Revert \"feat: x\"", 1, 1).revert_like());
    }
}
