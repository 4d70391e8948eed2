//! Core types for the Git Dungeon engine — zero external deps beyond serde.
//!
//! This crate defines every type used across the engine: IDs, enums,
//! the commit input model, game state structures, player actions, card
//! and event effects, game events, errors, and the seeded RNG. It has
//! no game logic — just data definitions.

pub mod action;
pub mod commit;
pub mod effect;
pub mod enums;
pub mod error;
pub mod event;
pub mod ids;
pub mod rng;
pub mod state;

// Re-export commonly used types at crate root
pub use action::{Action, ActionRecord};
pub use commit::CommitRecord;
pub use enums::*;
pub use error::{EngineError, ErrorKind};
pub use event::{EventKind, GameEvent};
pub use ids::*;
pub use rng::{RngState, StreamDomain};
pub use state::SAVE_SCHEMA_VERSION;
