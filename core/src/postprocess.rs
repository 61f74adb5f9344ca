#![deny(missing_docs)]

//! # Declaration Post-Processing
//!
//! `protoc-gen-es` emits `import { Message, proto3 } from "@bufbuild/protobuf";`
//! in its `.d.ts` output, where `proto3` is only used as a type. Under
//! `verbatimModuleSyntax` that import fails to compile, so it is rewritten to
//! a type-only import.

use crate::error::{AppError, AppResult};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Suffix of message declaration files.
pub const PB_DECLARATION_SUFFIX: &str = "_pb.d.ts";

const TYPE_ONLY_IMPORT: &str = r#"import { Message, type proto3 } from "@bufbuild/protobuf";"#;

fn proto3_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s+\{\s*Message,\s*proto3\s*\}\s*from\s+"@bufbuild/protobuf";"#)
            .expect("Invalid regex")
    })
}

/// Rewrites the `proto3` import in `source`.
pub fn rewrite_declaration(source: &str) -> String {
    proto3_import()
        .replace_all(source, TYPE_ONLY_IMPORT)
        .into_owned()
}

/// Applies [`rewrite_declaration`] to every `*_pb.d.ts` file under
/// `connect_dir`. Returns the files that changed.
pub fn post_process_declarations(connect_dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut changed = Vec::new();

    let walker = WalkDir::new(connect_dir).sort_by_file_name().into_iter();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_declaration = entry.file_type().is_file()
            && path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(PB_DECLARATION_SUFFIX));
        if !is_declaration {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let new_content = rewrite_declaration(&content);
        if new_content != content {
            fs::write(path, new_content).map_err(|e| AppError::emission(path, e))?;
            changed.push(path.to_path_buf());
        }
    }

    Ok(changed)
}
