#![deny(missing_docs)]

//! # Source Emission
//!
//! Renders and writes every file of the `trpc/` tree, the connect-query
//! modules and the package marker. Each emitter splits into a pure
//! `render_*` function and a writer.

use crate::error::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Aggregating router module.
pub mod app_router;

/// Connect-query re-export modules.
pub mod connectquery;

/// `trpc/index.ts`.
pub mod index;

/// `package.json` module-format marker.
pub mod package_marker;

/// Shared `routerFactory.ts` scaffold.
pub mod router_factory;

/// Per-service router modules.
pub mod service_router;

/// First line of every emitted source file.
pub const GENERATED_HEADER: &str = "// Code generated by proto-to-trpc. DO NOT EDIT.\n";

/// Writes `contents` to `path`, creating parent directories first.
/// Existing files are overwritten without comparison.
pub fn write_file(path: &Path, contents: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::emission(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| AppError::emission(path, e))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_file_creates_parents_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.ts");

        write_file(&path, "one").unwrap();
        write_file(&path, "two").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn test_write_file_reports_target_path() {
        let dir = tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = write_file(&blocker.join("x.ts"), "data").unwrap_err();
        match err {
            AppError::Emission { path, .. } => assert!(path.starts_with(&blocker)),
            other => panic!("Wrong error type: {:?}", other),
        }
    }
}
