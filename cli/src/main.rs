#![deny(missing_docs)]

//! # proto-to-trpc
//!
//! Command Line Interface for the `.proto` → ConnectRPC + tRPC generator.
//!
//! ```text
//! proto-to-trpc --proto_dir=./proto --out=./src/gen [--watch]
//! ```

use clap::Parser;
use proto_trpc_core::{generate, CodegenOptions, CompilerConfig, VerbRules};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod error;
mod watch;

#[derive(Parser, Debug)]
#[clap(name = "proto-to-trpc", author, version, about = "Generate tRPC routers from .proto files")]
struct Cli {
    /// Directory containing .proto files.
    #[clap(long = "proto_dir")]
    proto_dir: PathBuf,

    /// Output directory for generated code.
    #[clap(long = "out")]
    out: PathBuf,

    /// Re-run codegen when .proto files change.
    #[clap(long)]
    watch: bool,

    /// Comma-separated list of verbs to treat as queries (default: Get,List).
    #[clap(long = "query_verbs", value_delimiter = ',')]
    query_verbs: Option<Vec<String>>,

    /// Comma-separated list of verbs to treat as mutations (default: Create,Update,Delete).
    #[clap(long = "mutation_verbs", value_delimiter = ',')]
    mutation_verbs: Option<Vec<String>>,

    /// Path to the protoc binary (overrides $PROTOC).
    #[clap(long)]
    protoc: Option<PathBuf>,

    /// Additional import root for third-party definitions. Repeatable.
    #[clap(long = "proto_path")]
    proto_path: Vec<PathBuf>,

    /// Only generate ConnectRPC code (skip tRPC router generation).
    #[clap(long = "connect_only")]
    connect_only: bool,

    /// Polling interval for --watch, in milliseconds.
    #[clap(long = "poll_interval_ms", default_value_t = 500)]
    poll_interval_ms: u64,
}

/// Trims verb entries and drops empty ones. An all-empty list means "use
/// the defaults".
fn normalize_verbs(raw: Option<&[String]>) -> Option<Vec<String>> {
    let verbs: Vec<String> = raw?
        .iter()
        .map(|verb| verb.trim())
        .filter(|verb| !verb.is_empty())
        .map(str::to_string)
        .collect();
    (!verbs.is_empty()).then_some(verbs)
}

impl Cli {
    fn options(&self) -> CodegenOptions {
        let mut compiler = CompilerConfig::from_env();
        compiler.protoc_path = self.protoc.clone();
        // Explicit roots take precedence over $PROTOC_INCLUDE.
        let mut include_dirs = self.proto_path.clone();
        include_dirs.append(&mut compiler.include_dirs);
        compiler.include_dirs = include_dirs;

        CodegenOptions {
            proto_dir: self.proto_dir.clone(),
            out_dir: self.out.clone(),
            verbs: VerbRules::new(
                normalize_verbs(self.query_verbs.as_deref()),
                normalize_verbs(self.mutation_verbs.as_deref()),
            ),
            compiler,
            connect_only: self.connect_only,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> CliResult<()> {
    let options = cli.options();
    if cli.watch {
        return watch::run_watch(&options, Duration::from_millis(cli.poll_interval_ms));
    }
    generate(&options, &mut |line: &str| tracing::info!("{}", line))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
