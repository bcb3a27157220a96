//! Mapping from a source root to the directory holding its index store.
//!
//! The namespace key is the lowercase hex SHA-256 of the root's string form,
//! so the same root always lands in the same store and distinct roots never
//! share one.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{LightgrokError, Result};

/// Hex SHA-256 of the root path's string form.
pub fn namespace_key(source_root: &Path) -> String {
    let digest = Sha256::digest(source_root.to_string_lossy().as_bytes());
    format!("{:x}", digest)
}

/// `<index_root>/<namespace_key(source_root)>`. Pure; touches nothing on disk.
pub fn resolve_index_location(index_root: &Path, source_root: &Path) -> PathBuf {
    index_root.join(namespace_key(source_root))
}

/// Canonical absolute form of a root, so that `.`, `./src/` and `/abs/src`
/// resolve to one namespace.
pub fn canonical_root(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| LightgrokError::io(path, e))
}

/// Render a result path for reporting.
///
/// With `strip_root_prefix`, paths under `root` become `./relative/path`;
/// anything else is returned unchanged.
pub fn display_path(path: &str, root: &Path, strip_root_prefix: bool) -> String {
    if !strip_root_prefix {
        return path.to_string();
    }

    const SEP: char = std::path::MAIN_SEPARATOR;
    let root = root.to_string_lossy();
    let root = root.trim_end_matches(SEP);
    match path.strip_prefix(root) {
        Some(rest) if rest.starts_with(SEP) => {
            format!(".{}{}", SEP, rest.trim_start_matches(SEP))
        }
        // Single-file roots and paths outside the root are reported as-is
        _ => path.to_string(),
    }
}
