#![deny(missing_docs)]

//! # Codegen Pipeline
//!
//! Sequences every stage of a generation run:
//!
//! 1. **Discover** `.proto` files (none found is fatal).
//! 2. **Compile** them with `protoc`, capturing a descriptor set.
//! 3. **Post-process** message declarations.
//! 4. **Introspect** services from the descriptor set.
//! 5. **Emit** connect-query modules, then (unless `connect_only`) the router
//!    factory, per-service routers, the aggregator and the index.
//! 6. **Mark** the output tree as ES modules.
//!
//! Each stage reports one progress line before it runs. The first failure
//! aborts the run; files written by earlier stages are left in place, since
//! a later successful run overwrites all of them.

use crate::classify::VerbRules;
use crate::descriptor::load_services;
use crate::discover::discover_proto_files;
use crate::emit::app_router::emit_app_router;
use crate::emit::connectquery::emit_connectquery;
use crate::emit::index::emit_index;
use crate::emit::package_marker::emit_package_marker;
use crate::emit::router_factory::emit_router_factory;
use crate::emit::service_router::{emit_service_routers, ensure_unique_short_names};
use crate::error::{AppError, AppResult};
use crate::naming::OutputLayout;
use crate::postprocess::post_process_declarations;
use crate::protoc::{run_protoc, CommandExecutor, CompilerConfig, ProtocRequest, ShellExecutor};
use std::path::{Path, PathBuf};

/// File name of the descriptor set inside the scratch directory.
const DESCRIPTOR_SET_FILE: &str = "descriptors.binpb";

/// Inputs of one generation run.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Root of the `.proto` tree; also the primary import root.
    pub proto_dir: PathBuf,
    /// Root of the output tree.
    pub out_dir: PathBuf,
    /// Query/mutation classification policy.
    pub verbs: VerbRules,
    /// Compiler lookup configuration.
    pub compiler: CompilerConfig,
    /// Only produce the Connect output (skip every tRPC file).
    pub connect_only: bool,
}

impl CodegenOptions {
    /// Options with default verbs and an empty compiler configuration.
    pub fn new(proto_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            proto_dir: proto_dir.into(),
            out_dir: out_dir.into(),
            verbs: VerbRules::default(),
            compiler: CompilerConfig::default(),
            connect_only: false,
        }
    }
}

/// Runs the pipeline with the real `protoc`.
pub fn generate(options: &CodegenOptions, progress: &mut impl FnMut(&str)) -> AppResult<()> {
    run_codegen(options, &ShellExecutor, progress)
}

/// Runs the pipeline with `executor` standing in for the compiler.
pub fn run_codegen<E: CommandExecutor>(
    options: &CodegenOptions,
    executor: &E,
    progress: &mut impl FnMut(&str),
) -> AppResult<()> {
    let proto_dir = std::path::absolute(&options.proto_dir)?;
    let out_dir = std::path::absolute(&options.out_dir)?;
    let layout = OutputLayout::new(&out_dir);

    // 1. Discover
    progress(&format!("Discovering .proto files in {}", proto_dir.display()));
    let proto_files = discover_proto_files(&proto_dir)?;
    if proto_files.is_empty() {
        return Err(AppError::NoInput(proto_dir));
    }

    // 2. Compile
    progress("Running protoc to generate ConnectRPC and TS outputs...");
    let scratch = tempfile::tempdir()?;
    let descriptor_path = scratch.path().join(DESCRIPTOR_SET_FILE);
    run_protoc(
        &ProtocRequest {
            proto_files: &proto_files,
            out_dir: &layout.connect_dir,
            proto_dir: &proto_dir,
            descriptor_set_out: Some(&descriptor_path),
        },
        &options.compiler,
        executor,
    )?;

    // 3. Post-process
    progress("Post-processing protobuf declaration files...");
    post_process_declarations(&layout.connect_dir)?;

    // 4. Introspect
    progress("Reading service descriptors...");
    let files_to_generate = descriptor_names(&proto_files, &proto_dir);
    let services = load_services(&descriptor_path, &files_to_generate)?;
    tracing::debug!(count = services.len(), "services discovered");

    // 5. Emit
    progress("Emitting connectquery re-exports...");
    emit_connectquery(&services, &layout)?;

    if options.connect_only {
        progress("Skipping tRPC generation (--connect-only)");
    } else {
        ensure_unique_short_names(&services)?;

        progress("Emitting tRPC router factory...");
        emit_router_factory(&layout, &options.verbs)?;

        progress("Emitting per-service routers...");
        let service_infos = emit_service_routers(&services, &layout, &options.verbs)?;

        progress("Emitting appRouter...");
        emit_app_router(&service_infos, &layout)?;

        progress("Emitting index file...");
        emit_index(&layout)?;
    }

    // 6. Mark
    progress("Emitting package.json...");
    emit_package_marker(&layout)?;

    progress("Code generation complete.");
    Ok(())
}

/// Names `protoc` gives the input files: paths relative to the import
/// root, `/`-separated.
fn descriptor_names(proto_files: &[PathBuf], proto_dir: &Path) -> Vec<String> {
    proto_files
        .iter()
        .map(|file| {
            let relative = file.strip_prefix(proto_dir).unwrap_or(file);
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect()
}
