//! Status definitions — stack caps and duration defaults for the
//! built-in status kinds. Trigger behaviour lives in the engine and is
//! keyed by `StatusKind`; these records bound it.

use gd_types::enums::StatusKind;
use gd_types::ids::StatusId;
use serde::{Deserialize, Serialize};

/// Complete status definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub id: StatusId,
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    pub kind: StatusKind,
    /// Application beyond this clamps.
    pub max_stacks: u32,
    /// Turns applied by default when the applier names none;
    /// `None` keeps the status until something removes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_duration: Option<u32>,
}

fn status(kind: StatusKind, max_stacks: u32) -> StatusDefinition {
    let id = kind.id();
    StatusDefinition {
        name_key: format!("status.{id}.name").into(),
        desc_key: format!("status.{id}.desc").into(),
        id,
        kind,
        max_stacks,
        default_duration: None,
    }
}

/// The built-in statuses, ordered by ID.
pub fn default_statuses() -> Vec<StatusDefinition> {
    let mut statuses = vec![
        status(StatusKind::Vulnerable, 10),
        status(StatusKind::Weak, 10),
        status(StatusKind::Burn, 15),
        status(StatusKind::Thorns, 10),
        status(StatusKind::Charge, 3),
        status(StatusKind::Focus, 3),
        status(StatusKind::TechDebt, 5),
        status(StatusKind::Bug, 10),
    ];
    statuses.sort_by(|a, b| a.id.cmp(&b.id));
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_kinds_covered_once() {
        let statuses = default_statuses();
        assert_eq!(statuses.len(), 8);
        for pair in statuses.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn caps_are_positive() {
        for s in default_statuses() {
            assert!(s.max_stacks > 0, "{} has a zero cap", s.id);
        }
    }
}
