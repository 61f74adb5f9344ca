#![deny(missing_docs)]

//! # Watch Mode
//!
//! Re-runs the pipeline whenever a `.proto` file under the root is added,
//! changed or removed.
//!
//! The tree is polled: each poll captures a snapshot (path → modification
//! time and size) and compares it with the previous one. Runs happen on the
//! polling thread, so they never overlap, and any number of edits made while
//! a run is in flight collapse into a single follow-up run.

use crate::error::{CliError, CliResult};
use proto_trpc_core::discover::is_proto_file;
use proto_trpc_core::{generate, CodegenOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

/// State of every `.proto` file under a root at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    files: BTreeMap<PathBuf, (Option<SystemTime>, u64)>,
}

impl TreeSnapshot {
    /// Captures the tree under `root`. Unreadable entries are skipped.
    pub fn capture(root: &Path) -> Self {
        let files = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_proto_file(e.path()))
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                Some((e.into_path(), (meta.modified().ok(), meta.len())))
            })
            .collect();
        Self { files }
    }
}

/// Polls a tree and reports whether it changed since the last poll.
pub struct TreeWatcher {
    root: PathBuf,
    last: Option<TreeSnapshot>,
}

impl TreeWatcher {
    /// Watches `root`. The first poll always reports a change.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last: None,
        }
    }

    /// True if the tree differs from the previous poll.
    pub fn poll(&mut self) -> bool {
        let current = TreeSnapshot::capture(&self.root);
        let changed = self.last.as_ref() != Some(&current);
        self.last = Some(current);
        changed
    }
}

/// Runs the pipeline on start and after every change, forever.
///
/// A failed run is logged and the watch continues.
pub fn run_watch(options: &CodegenOptions, interval: Duration) -> CliResult<()> {
    if !options.proto_dir.is_dir() {
        return Err(CliError::General(format!(
            "Definition directory not found: {}",
            options.proto_dir.display()
        )));
    }

    tracing::info!(
        "Watching {} for changes...",
        options.proto_dir.join("**/*.proto").display()
    );

    let mut watcher = TreeWatcher::new(&options.proto_dir);
    loop {
        if watcher.poll() {
            tracing::info!("Running codegen...");
            match generate(options, &mut |line: &str| tracing::info!("{}", line)) {
                Ok(()) => tracing::info!("Codegen finished."),
                Err(e) => tracing::error!("{}", e),
            }
        }
        std::thread::sleep(interval);
    }
}
