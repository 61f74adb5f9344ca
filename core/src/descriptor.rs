#![deny(missing_docs)]

//! # Service Introspection
//!
//! Reads the binary `FileDescriptorSet` that `protoc` writes alongside the
//! generated modules and extracts the services and methods declared in the
//! files that were compiled.
//!
//! Working from the descriptor set keeps this step hermetic: nothing the
//! compiler generated has to be executed to learn its shape.

use crate::error::{AppError, AppResult};
use prost::Message;
use prost_types::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};
use std::collections::HashMap;
use std::path::Path;

/// A message type referenced by a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Fully qualified name without the leading dot (`orders.v1.Order`).
    pub type_name: String,
    /// Identifier the message generator exports (`Order`, `Outer_Inner`).
    pub local_name: String,
    /// Definition file declaring the message, relative to its import root.
    pub proto_file: String,
}

/// One RPC method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method name as declared (`GetOrder`).
    pub name: String,
    /// Request message.
    pub input: MessageRef,
    /// Response message.
    pub output: MessageRef,
    /// Client sends a stream.
    pub client_streaming: bool,
    /// Server replies with a stream.
    pub server_streaming: bool,
}

/// One service declared in a compiled definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Exported service name (`OrderService`).
    pub name: String,
    /// Fully qualified name (`orders.v1.OrderService`).
    pub type_name: String,
    /// Declaring definition file, relative to its import root.
    pub proto_file: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

/// Decodes the descriptor set at `path`.
pub fn read_descriptor_set(path: &Path) -> AppResult<FileDescriptorSet> {
    let bytes = std::fs::read(path).map_err(|e| {
        AppError::Descriptor(format!("Failed to read {}: {}", path.display(), e))
    })?;
    FileDescriptorSet::decode(bytes.as_slice()).map_err(|e| {
        AppError::Descriptor(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Loads the services declared in `files_to_generate` from the descriptor
/// set at `path`.
pub fn load_services(path: &Path, files_to_generate: &[String]) -> AppResult<Vec<ServiceDescriptor>> {
    let set = read_descriptor_set(path)?;
    Ok(collect_services(&set, files_to_generate))
}

/// Extracts services from `set`, restricted to `files_to_generate`.
///
/// Files are visited in the order of `files_to_generate`, so imports pulled
/// in with `--include_imports` never contribute services.
pub fn collect_services(set: &FileDescriptorSet, files_to_generate: &[String]) -> Vec<ServiceDescriptor> {
    let index = TypeIndex::build(set);
    let by_name: HashMap<&str, &FileDescriptorProto> =
        set.file.iter().map(|f| (f.name(), f)).collect();

    let mut services = Vec::new();
    for file_name in files_to_generate {
        let Some(file) = by_name.get(file_name.as_str()) else {
            tracing::warn!(file = %file_name, "compiled file missing from descriptor set");
            continue;
        };

        for service in &file.service {
            let methods = service
                .method
                .iter()
                .map(|m| MethodDescriptor {
                    name: m.name().to_string(),
                    input: index.resolve(m.input_type(), file.name()),
                    output: index.resolve(m.output_type(), file.name()),
                    client_streaming: m.client_streaming(),
                    server_streaming: m.server_streaming(),
                })
                .collect();

            services.push(ServiceDescriptor {
                name: service.name().to_string(),
                type_name: qualify(file.package(), service.name()),
                proto_file: file.name().to_string(),
                methods,
            });
        }
    }
    services
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

/// Maps fully qualified message names to their generated identity.
struct TypeIndex {
    messages: HashMap<String, (String, String)>,
}

impl TypeIndex {
    fn build(set: &FileDescriptorSet) -> Self {
        let mut messages = HashMap::new();
        for file in &set.file {
            for message in &file.message_type {
                index_message(&mut messages, file, file.package(), "", message);
            }
        }
        Self { messages }
    }

    /// Resolves a `.pkg.Type` reference; unknown types fall back to the
    /// last segment, declared in `fallback_file`.
    fn resolve(&self, reference: &str, fallback_file: &str) -> MessageRef {
        let type_name = reference.trim_start_matches('.').to_string();
        match self.messages.get(&type_name) {
            Some((local_name, proto_file)) => MessageRef {
                type_name,
                local_name: local_name.clone(),
                proto_file: proto_file.clone(),
            },
            None => MessageRef {
                local_name: type_name
                    .rsplit('.')
                    .next()
                    .unwrap_or(&type_name)
                    .to_string(),
                proto_file: fallback_file.to_string(),
                type_name,
            },
        }
    }
}

fn index_message(
    messages: &mut HashMap<String, (String, String)>,
    file: &FileDescriptorProto,
    scope: &str,
    local_prefix: &str,
    message: &DescriptorProto,
) {
    let full_name = qualify(scope, message.name());
    let local_name = if local_prefix.is_empty() {
        message.name().to_string()
    } else {
        format!("{}_{}", local_prefix, message.name())
    };

    for nested in &message.nested_type {
        index_message(messages, file, &full_name, &local_name, nested);
    }
    messages.insert(full_name, (local_name, file.name().to_string()));
}
