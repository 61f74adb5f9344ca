#![deny(missing_docs)]

//! # Naming & Path Utilities
//!
//! Identifier derivations and output-tree paths used by the emitters.
//! Kept free of any text rendering so each rule can be tested on its own.

use std::path::{Component, Path, PathBuf};

/// Extension of every emitted source file.
pub const SOURCE_EXT: &str = "ts";

/// Suffix of generated service-binding modules.
pub const CONNECT_SUFFIX: &str = "_connect";

/// Suffix of generated message modules.
pub const PB_SUFFIX: &str = "_pb";

/// Suffix of emitted connect-query modules.
pub const CONNECTQUERY_SUFFIX: &str = "_connectquery";

/// Package that exports the well-known `google.protobuf` types.
pub const WELL_KNOWN_TYPES_MODULE: &str = "@bufbuild/protobuf";

/// Method names that clash with `Object.prototype` members get a `$` suffix.
const RESERVED_LOCAL_NAMES: &[&str] = &["constructor", "toString", "toJSON", "valueOf"];

/// ECMAScript reserved words and strict-mode keywords. They cannot name a
/// binding, so exported identifiers that match one get a `$` suffix.
const RESERVED_IDENTIFIERS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Strips one trailing `Service` from a service name.
///
/// e.g. `OrderService` -> `Order`, `Service` -> `Service`
pub fn short_name(service_name: &str) -> &str {
    match service_name.strip_suffix("Service") {
        Some(stem) if !stem.is_empty() => stem,
        _ => service_name,
    }
}

/// Exported router factory identifier, e.g. `OrderServiceRouter`.
pub fn router_ident(service_name: &str) -> String {
    format!("{}Router", service_name)
}

/// File name of a service's router module.
pub fn router_file_name(service_name: &str) -> String {
    format!("{}.{}", router_ident(service_name), SOURCE_EXT)
}

/// The client-side method name the service generator exports.
///
/// Underscores are dropped with the next letter upper-cased, then the first
/// letter is lower-cased: `GetOrder` -> `getOrder`, `get_order` -> `getOrder`.
pub fn method_local_name(method_name: &str) -> String {
    let mut camel = String::with_capacity(method_name.len());
    let mut upper_next = false;
    for c in method_name.chars() {
        if c == '_' {
            upper_next = !camel.is_empty();
            continue;
        }
        if upper_next {
            camel.extend(c.to_uppercase());
            upper_next = false;
        } else {
            camel.push(c);
        }
    }

    let mut chars = camel.chars();
    let mut local = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if RESERVED_LOCAL_NAMES.contains(&local.as_str()) {
        local.push('$');
    }
    local
}

/// Makes `name` usable as a top-level binding: `delete` -> `delete$`.
///
/// Property keys such as `client.delete` need no escaping, so this is only
/// applied where a name is declared.
pub fn safe_identifier(name: &str) -> String {
    if RESERVED_IDENTIFIERS.contains(&name) {
        format!("{}$", name)
    } else {
        name.to_string()
    }
}

/// Path of a generated module for `proto_file` (without extension).
///
/// `orders/v1/order.proto` + `_pb` -> `<connect_dir>/orders/v1/order_pb`
pub fn generated_module(connect_dir: &Path, proto_file: &str, suffix: &str) -> PathBuf {
    let relative = Path::new(proto_file);
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    connect_dir.join(parent).join(format!("{}{}", stem, suffix))
}

/// Relative import specifier from `from_dir` to `target`, always with `/`
/// separators and an explicit `./` or `../` lead.
pub fn relative_import(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Import specifier for the messages of `proto_file`, as seen from `from_dir`.
pub fn message_import(from_dir: &Path, connect_dir: &Path, proto_file: &str) -> String {
    if proto_file.starts_with("google/protobuf/") {
        return WELL_KNOWN_TYPES_MODULE.to_string();
    }
    format!(
        "{}.js",
        relative_import(from_dir, &generated_module(connect_dir, proto_file, PB_SUFFIX))
    )
}

/// Directory layout of one output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Root of the output tree; holds `package.json`.
    pub root: PathBuf,
    /// Compiler output.
    pub connect_dir: PathBuf,
    /// tRPC glue.
    pub trpc_dir: PathBuf,
    /// Per-service router modules.
    pub routers_dir: PathBuf,
}

impl OutputLayout {
    /// Lays out the tree under `root`.
    pub fn new(root: &Path) -> Self {
        let trpc_dir = root.join("trpc");
        Self {
            root: root.to_path_buf(),
            connect_dir: root.join("connect"),
            routers_dir: trpc_dir.join("routers"),
            trpc_dir,
        }
    }

    /// `trpc/<name>.ts`
    pub fn trpc_file(&self, name: &str) -> PathBuf {
        self.trpc_dir.join(format!("{}.{}", name, SOURCE_EXT))
    }

    /// `trpc/routers/<Service>Router.ts`
    pub fn router_file(&self, service_name: &str) -> PathBuf {
        self.routers_dir.join(router_file_name(service_name))
    }

    /// `<root>/package.json`
    pub fn package_marker(&self) -> PathBuf {
        self.root.join("package.json")
    }
}
