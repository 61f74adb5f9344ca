//! Emits `trpc/routerFactory.ts`: the shared `t` instance, the `protobuf`
//! pass-through validator, the verb constants and a generic
//! `createServiceRouter` for callers wiring services by hand.

use super::{write_file, GENERATED_HEADER};
use crate::classify::VerbRules;
use crate::error::{AppError, AppResult};
use crate::naming::OutputLayout;

/// Module name of the scaffold, relative to `trpc/`.
pub const ROUTER_FACTORY_MODULE: &str = "routerFactory";

/// Renders the scaffold for `verbs`.
pub fn render_router_factory(verbs: &VerbRules) -> AppResult<String> {
    let query = json_array(verbs.query_verbs())?;
    let mutation = json_array(verbs.mutation_verbs())?;

    let mut code = String::from(GENERATED_HEADER);
    code.push_str("import { initTRPC } from \"@trpc/server\";\n");
    code.push_str(
        "import type { AnyService, MethodInfoUnary, Client } from \"@connectrpc/connect\";\n\n",
    );
    code.push_str("export const t = initTRPC.create();\n\n");

    code.push_str("export function protobuf<T>() {\n");
    code.push_str("\treturn (value: unknown) => value as T;\n");
    code.push_str("}\n\n");

    code.push_str(&format!("export const QUERY_PREFIXES = {} as const;\n", query));
    code.push_str(&format!(
        "export const MUTATION_PREFIXES = {} as const;\n\n",
        mutation
    ));

    // Only the query list decides; everything else is a mutation.
    code.push_str("export function isQuery(name: string): boolean {\n");
    code.push_str("\treturn QUERY_PREFIXES.some((prefix) => name.startsWith(prefix));\n");
    code.push_str("}\n\n");

    code.push_str("export function createServiceRouter<T extends AnyService>(\n");
    code.push_str("\tservice: T,\n");
    code.push_str("\tclient: Client<T>,\n");
    code.push_str(") {\n");
    code.push_str("\tconst procedures: Record<string, any> = {};\n\n");
    code.push_str(
        "\tfor (const [localName, method] of Object.entries(service.methods) as [string, MethodInfoUnary][]) {\n",
    );
    code.push_str(
        "\t\tconst fn = (client[localName as keyof Client<T>] as CallableFunction).bind(client);\n",
    );
    code.push_str("\t\tconst procedure = t.procedure.input(method.I).output(method.O);\n\n");
    code.push_str("\t\tprocedures[method.name] = isQuery(method.name)\n");
    code.push_str("\t\t\t? procedure.query(async ({ input }) => fn(input))\n");
    code.push_str("\t\t\t: procedure.mutation(async ({ input }) => fn(input));\n");
    code.push_str("\t}\n\n");
    code.push_str("\treturn t.router(procedures);\n");
    code.push_str("}\n");

    Ok(code)
}

/// Writes `trpc/routerFactory.ts`.
pub fn emit_router_factory(layout: &OutputLayout, verbs: &VerbRules) -> AppResult<()> {
    let code = render_router_factory(verbs)?;
    write_file(&layout.trpc_file(ROUTER_FACTORY_MODULE), &code)
}

fn json_array(verbs: &[String]) -> AppResult<String> {
    serde_json::to_string(verbs)
        .map_err(|e| AppError::General(format!("Failed to serialize verbs: {}", e)))
}
