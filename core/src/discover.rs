#![deny(missing_docs)]

//! # Definition Discovery
//!
//! Recursively enumerates `.proto` files under a root directory.

use crate::error::AppResult;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use walkdir::WalkDir;

/// File extension of interface-definition sources.
pub const PROTO_EXTENSION: &str = "proto";

/// Returns the absolute path of every `.proto` file under `root`.
///
/// A missing root is an empty result, not an error; the orchestrator decides
/// whether "nothing found" is fatal. Entries are visited in file-name order
/// so the result is stable across runs.
pub fn discover_proto_files(root: &Path) -> AppResult<Vec<PathBuf>> {
    let root = std::path::absolute(normalize_root(root))?;

    let files = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_proto_file(e.path()))
        .map(|e| e.into_path())
        .collect();

    Ok(files)
}

/// True when `path` carries the `.proto` extension.
pub fn is_proto_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PROTO_EXTENSION)
}

/// Strips a single trailing separator, keeping a bare root (`/`) intact.
fn normalize_root(root: &Path) -> PathBuf {
    let raw = root.to_string_lossy();
    match raw.strip_suffix(MAIN_SEPARATOR) {
        Some(stripped) if !stripped.is_empty() => PathBuf::from(stripped),
        _ => root.to_path_buf(),
    }
}
