//! Error kinds shared across the engine boundary.
//!
//! Illegal actions never surface as `Err` from the action pipeline —
//! they become `error` events and leave state untouched. These types
//! cover everything else: load-time validation, repository problems,
//! save-schema failures, and resource limits.

use serde::{Deserialize, Serialize};

/// Stable error categories with stable string codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing required field, unknown referenced ID, or a duplicate ID
    /// with a differing definition in a content pack.
    ContentValidation,
    /// Path not found, not a repository, or commit cap exceeded.
    Repository,
    /// Wrong phase, insufficient energy, unknown card ID, and the like.
    IllegalAction,
    /// Unreadable save version or corrupt document.
    SaveSchema,
    /// Memory / commit-count / file-descriptor style exhaustion.
    ResourceLimit,
    /// Invariant violation — a bug, not a user error.
    Programmer,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::ContentValidation => "content_validation",
            Self::Repository => "repository",
            Self::IllegalAction => "illegal_action",
            Self::SaveSchema => "save_schema",
            Self::ResourceLimit => "resource_limit",
            Self::Programmer => "programmer",
        }
    }
}

/// An engine error: a kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: Box<str>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<Box<str>>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn content(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::ContentValidation, message)
    }

    pub fn repository(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::Repository, message)
    }

    pub fn illegal(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::IllegalAction, message)
    }

    pub fn save_schema(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::SaveSchema, message)
    }

    pub fn resource(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::ResourceLimit, message)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stable_code() {
        let err = EngineError::illegal("not the player phase");
        assert_eq!(err.to_string(), "illegal_action: not the player phase");
    }

    #[test]
    fn kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::SaveSchema.code(), "save_schema");
        assert_eq!(ErrorKind::ContentValidation.code(), "content_validation");
    }
}
