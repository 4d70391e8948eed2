//! Content-pack discovery and loading.
//!
//! Packs are directories holding a `pack.json` document. Resolution
//! order (low to high precedence): explicit `--pack` references in
//! user order, then the `GIT_DUNGEON_CONTENT_DIR` directory scanned in
//! sorted order. Duplicate paths load once.

use std::fs;
use std::path::{Path, PathBuf};

use gd_data::registry::{build_default_registry, merge_packs, ContentPack};
use gd_data::ContentRegistry;
use gd_types::EngineError;

const PACK_FILE: &str = "pack.json";

fn is_pack_dir(path: &Path) -> bool {
    path.is_dir() && path.join(PACK_FILE).exists()
}

fn discover_pack_dirs(root: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let entries = fs::read_dir(root)
        .map_err(|e| EngineError::content(format!("cannot scan {}: {e}", root.display())))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_pack_dir(p))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Resolve pack directories from CLI args and the environment.
pub fn resolve_pack_dirs(
    pack_args: &[String],
    env_dir: Option<&str>,
) -> Result<Vec<PathBuf>, EngineError> {
    let mut resolved = Vec::new();

    for raw in pack_args {
        let candidate = PathBuf::from(raw);
        if is_pack_dir(&candidate) {
            resolved.push(candidate);
        } else if candidate.is_dir() {
            let discovered = discover_pack_dirs(&candidate)?;
            if discovered.is_empty() {
                return Err(EngineError::content(format!(
                    "no content packs under directory: {}",
                    candidate.display()
                )));
            }
            resolved.extend(discovered);
        } else {
            return Err(EngineError::content(format!("content pack not found: {raw}")));
        }
    }

    if let Some(env_dir) = env_dir {
        let root = PathBuf::from(env_dir);
        if !root.is_dir() {
            return Err(EngineError::content(format!(
                "GIT_DUNGEON_CONTENT_DIR is not a directory: {env_dir}"
            )));
        }
        resolved.extend(discover_pack_dirs(&root)?);
    }

    // De-duplicate, keeping first occurrence.
    let mut unique: Vec<PathBuf> = Vec::new();
    for path in resolved {
        let canonical = path.canonicalize().unwrap_or(path);
        if !unique.contains(&canonical) {
            unique.push(canonical);
        }
    }
    Ok(unique)
}

fn load_pack(dir: &Path) -> Result<(ContentPack, Box<str>), EngineError> {
    let file = dir.join(PACK_FILE);
    let text = fs::read_to_string(&file)
        .map_err(|e| EngineError::content(format!("cannot read {}: {e}", file.display())))?;
    let pack: ContentPack = serde_json::from_str(&text)
        .map_err(|e| EngineError::content(format!("malformed pack {}: {e}", file.display())))?;
    if pack.id.as_str().is_empty() {
        return Err(EngineError::content(format!("pack {} has no id", file.display())));
    }
    Ok((pack, dir.display().to_string().into()))
}

/// Build the registry: defaults overlaid with every resolved pack.
pub fn load_registry(
    pack_args: &[String],
    env_dir: Option<&str>,
) -> Result<ContentRegistry, EngineError> {
    let base = build_default_registry();
    let dirs = resolve_pack_dirs(pack_args, env_dir)?;
    if dirs.is_empty() {
        return Ok(base);
    }
    let packs = dirs.iter().map(|d| load_pack(d)).collect::<Result<Vec<_>, _>>()?;
    merge_packs(base, packs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_packs_yields_the_default_registry() {
        let registry = load_registry(&[], None).unwrap();
        assert!(registry.pack_ids.is_empty());
    }

    #[test]
    fn missing_pack_reference_is_a_content_error() {
        let err = load_registry(&["/no/such/pack".to_owned()], None).unwrap_err();
        assert_eq!(err.kind, gd_types::ErrorKind::ContentValidation);
    }
}
