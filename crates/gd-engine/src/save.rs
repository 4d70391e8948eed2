//! The save document — stable JSON with explicit schema versioning.
//!
//! Writers always emit the current version. Readers accept older
//! versions and upgrade in memory; fields they do not recognise ride
//! along in `extra` and survive a round-trip byte-for-byte (struct
//! fields serialise in declaration order, everything else is a
//! BTreeMap, so equal documents serialise to equal bytes).

use std::collections::BTreeMap;

use gd_types::action::ActionRecord;
use gd_types::state::GameState;
use gd_types::{EngineError, Mutator, PackId, SAVE_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The on-disk save document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub schema_version: u32,
    pub run_id: Box<str>,
    pub seed: u32,
    pub mutator: Mutator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_date: Option<Box<str>>,
    pub content_pack_ids: Vec<PackId>,
    /// Timestamp the run was created with; replays reuse it so the
    /// opening events reproduce exactly.
    pub created_at: i64,
    pub action_log: Vec<ActionRecord>,
    pub state: GameState,
    /// Fields written by a future schema we do not understand.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Build the document for the current run state.
pub fn save_document(
    state: &GameState,
    action_log: &[ActionRecord],
    created_at: i64,
    daily_date: Option<&str>,
) -> SaveDocument {
    let mut pack_ids = state.pack_ids.clone();
    pack_ids.sort();
    SaveDocument {
        schema_version: SAVE_SCHEMA_VERSION,
        run_id: state.run_id.clone(),
        seed: state.seed,
        mutator: state.mutator,
        daily_date: daily_date.map(Into::into),
        content_pack_ids: pack_ids,
        created_at,
        action_log: action_log.to_vec(),
        state: state.clone(),
        extra: BTreeMap::new(),
    }
}

pub fn to_json(doc: &SaveDocument) -> String {
    serde_json::to_string(doc).expect("save documents always serialise")
}

/// Parse a document, upgrading older schema versions in memory.
pub fn from_json(json: &str) -> Result<SaveDocument, EngineError> {
    let mut value: Value = serde_json::from_str(json)
        .map_err(|e| EngineError::save_schema(format!("corrupt save document: {e}")))?;

    let Some(version) = value.get("schema_version").and_then(Value::as_u64) else {
        return Err(EngineError::save_schema("save document has no schema_version"));
    };
    if version > u64::from(SAVE_SCHEMA_VERSION) {
        return Err(EngineError::save_schema(format!(
            "save schema {version} is newer than this engine ({SAVE_SCHEMA_VERSION})"
        )));
    }
    if version < u64::from(SAVE_SCHEMA_VERSION) {
        migrate(&mut value, version)?;
    }

    serde_json::from_value(value)
        .map_err(|e| EngineError::save_schema(format!("corrupt save document: {e}")))
}

/// In-memory schema upgrades. Version 1 predates mutators and content
/// packs; it gains their default fields.
fn migrate(value: &mut Value, from: u64) -> Result<(), EngineError> {
    if from == 0 {
        return Err(EngineError::save_schema("save schema 0 is unreadable"));
    }
    let Some(root) = value.as_object_mut() else {
        return Err(EngineError::save_schema("save document is not an object"));
    };

    if from == 1 {
        root.entry("mutator").or_insert_with(|| Value::String("none".into()));
        root.entry("content_pack_ids").or_insert_with(|| Value::Array(Vec::new()));
        root.entry("created_at").or_insert(Value::from(0));
        if let Some(state) = root.get_mut("state").and_then(Value::as_object_mut) {
            state.entry("mutator").or_insert_with(|| Value::String("none".into()));
            state.entry("difficulty").or_insert_with(|| Value::String("none".into()));
            state.entry("pack_ids").or_insert_with(|| Value::Array(Vec::new()));
            state.insert("schema_version".into(), Value::from(SAVE_SCHEMA_VERSION));
        }
    }
    root.insert("schema_version".into(), Value::from(SAVE_SCHEMA_VERSION));
    Ok(())
}
