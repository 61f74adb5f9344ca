//! Emits `package.json` at the root of the output tree, declaring the
//! generated files as ES modules.

use super::write_file;
use crate::error::{AppError, AppResult};
use crate::naming::OutputLayout;
use serde::Serialize;

/// Contents of the marker.
#[derive(Debug, Serialize)]
struct PackageMarker {
    #[serde(rename = "type")]
    module_type: &'static str,
}

/// Renders the marker, tab-indented.
pub fn render_package_marker() -> AppResult<String> {
    let marker = PackageMarker {
        module_type: "module",
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    marker
        .serialize(&mut ser)
        .map_err(|e| AppError::General(format!("Failed to serialize package.json: {}", e)))?;

    String::from_utf8(buf).map_err(|e| AppError::General(e.to_string()))
}

/// Writes `<out>/package.json`.
pub fn emit_package_marker(layout: &OutputLayout) -> AppResult<()> {
    write_file(&layout.package_marker(), &render_package_marker()?)
}
