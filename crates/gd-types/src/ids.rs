//! Branded/newtype ID types for type safety.
//!
//! Content entities carry stable string IDs; runtime entities carry
//! opaque per-run IDs formatted from (domain, index). Each ID wraps a
//! `Box<str>` for cheap cloning and small struct size.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Box<str>);

        impl $name {
            pub fn new(s: impl Into<Box<str>>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into_boxed_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Card identifier (e.g., "strike", "debug_strike").
    CardId
);

define_id!(
    /// Relic identifier (e.g., "git_init", "test_framework").
    RelicId
);

define_id!(
    /// Status effect identifier (e.g., "vulnerable", "tech_debt").
    StatusId
);

define_id!(
    /// Enemy definition identifier (keyed by commit kind, e.g., "bug_swarm").
    EnemyId
);

define_id!(
    /// Event definition identifier.
    EventId
);

define_id!(
    /// Archetype identifier ("debug_beatdown", "test_shrine", "refactor_risk").
    ArchetypeId
);

define_id!(
    /// Playable character identifier.
    CharacterId
);

define_id!(
    /// Content pack identifier (part of the run fingerprint).
    PackId
);

define_id!(
    /// Chapter instance identifier (e.g., "chapter_3").
    ChapterId
);

define_id!(
    /// Route node instance identifier (e.g., "c2-n05").
    NodeId
);

impl ChapterId {
    /// Canonical chapter ID for a chapter index.
    pub fn from_index(index: u32) -> Self {
        Self::new(format!("chapter_{index}"))
    }
}

impl NodeId {
    /// Canonical node ID for (chapter index, node position).
    pub fn from_position(chapter_index: u32, position: u32) -> Self {
        Self::new(format!("c{chapter_index}-n{position:02}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_as_plain_strings() {
        let card = CardId::from("debug_strike");
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "\"debug_strike\"");
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn runtime_ids_are_positional() {
        assert_eq!(ChapterId::from_index(3).as_str(), "chapter_3");
        assert_eq!(NodeId::from_position(2, 5).as_str(), "c2-n05");
    }
}
