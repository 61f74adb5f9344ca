//! Emits `trpc/appRouter.ts`, combining every service router under its
//! short name.

use super::router_factory::ROUTER_FACTORY_MODULE;
use super::service_router::ServiceInfo;
use super::{write_file, GENERATED_HEADER};
use crate::error::AppResult;
use crate::naming::{self, OutputLayout};

/// Module name of the aggregator, relative to `trpc/`.
pub const APP_ROUTER_MODULE: &str = "appRouter";

/// Renders the aggregator for `services`, in order.
pub fn render_app_router(services: &[ServiceInfo]) -> String {
    let mut code = String::from(GENERATED_HEADER);
    code.push_str(&format!(
        "import {{ t }} from \"./{}\";\n",
        ROUTER_FACTORY_MODULE
    ));
    for service in services {
        code.push_str(&format!(
            "import {{ {} }} from \"{}\";\n",
            naming::router_ident(&service.name),
            service.import_path
        ));
    }

    code.push_str("\nexport function createAppRouter(connectBaseUrl: string) {\n");
    code.push_str("\treturn t.router({\n");
    for service in services {
        code.push_str(&format!(
            "\t\t{}: {}(connectBaseUrl),\n",
            naming::short_name(&service.name),
            naming::router_ident(&service.name)
        ));
    }
    code.push_str("\t});\n");
    code.push_str("}\n\n");
    code.push_str("export type AppRouter = ReturnType<typeof createAppRouter>;\n");
    code
}

/// Writes `trpc/appRouter.ts`.
pub fn emit_app_router(services: &[ServiceInfo], layout: &OutputLayout) -> AppResult<()> {
    write_file(
        &layout.trpc_file(APP_ROUTER_MODULE),
        &render_app_router(services),
    )
}
