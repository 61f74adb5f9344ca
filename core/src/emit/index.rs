//! Emits `trpc/index.ts`.

use super::app_router::APP_ROUTER_MODULE;
use super::router_factory::ROUTER_FACTORY_MODULE;
use super::{write_file, GENERATED_HEADER};
use crate::error::AppResult;
use crate::naming::OutputLayout;

/// Renders the re-export index.
pub fn render_index() -> String {
    format!(
        "{}export * from \"./{}\";\nexport * from \"./{}\";\n",
        GENERATED_HEADER, APP_ROUTER_MODULE, ROUTER_FACTORY_MODULE
    )
}

/// Writes `trpc/index.ts`.
pub fn emit_index(layout: &OutputLayout) -> AppResult<()> {
    write_file(&layout.trpc_file("index"), &render_index())
}
