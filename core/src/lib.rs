#![deny(missing_docs)]

//! # proto-trpc core
//!
//! Turns a tree of `.proto` definitions into ConnectRPC bindings (via
//! `protoc`) plus tRPC routers that expose every RPC method as a typed
//! query or mutation.

/// Shared error types.
pub mod error;

/// Definition discovery.
pub mod discover;

/// External compiler invocation.
pub mod protoc;

/// Declaration post-processing.
pub mod postprocess;

/// Descriptor set introspection.
pub mod descriptor;

/// Query/mutation classification.
pub mod classify;

/// Identifier and path derivations.
pub mod naming;

/// Source emitters.
pub mod emit;

/// Stage orchestration.
pub mod pipeline;

pub use classify::{classify, ProcedureKind, VerbRules, DEFAULT_MUTATION_VERBS, DEFAULT_QUERY_VERBS};
pub use descriptor::{load_services, MessageRef, MethodDescriptor, ServiceDescriptor};
pub use discover::discover_proto_files;
pub use emit::service_router::ServiceInfo;
pub use error::{AppError, AppResult};
pub use naming::{short_name, OutputLayout};
pub use pipeline::{generate, run_codegen, CodegenOptions};
pub use protoc::{run_protoc, CommandExecutor, CompilerCommand, CompilerConfig, ProtocRequest, ShellExecutor};
