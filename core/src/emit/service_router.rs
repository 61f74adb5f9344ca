#![deny(missing_docs)]

//! # Service Router Emission
//!
//! One `trpc/routers/<Service>Router.ts` per service. Each module builds a
//! Connect transport and client for a base URL and exposes every RPC method
//! as a tRPC procedure.
//!
//! Emission happens in two steps: [`plan_router`] derives names, import
//! specifiers and procedure kinds; [`render_router`] turns the plan into text.

use super::router_factory::ROUTER_FACTORY_MODULE;
use super::{write_file, GENERATED_HEADER};
use crate::classify::{ProcedureKind, VerbRules};
use crate::descriptor::{MessageRef, ServiceDescriptor};
use crate::error::{AppError, AppResult};
use crate::naming::{self, OutputLayout, CONNECT_SUFFIX};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// A router that has been written, as consumed by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Service name (`OrderService`).
    pub name: String,
    /// Written router module.
    pub file: PathBuf,
    /// Import specifier relative to `trpc/` (`./routers/OrderServiceRouter`).
    pub import_path: String,
}

/// One procedure of a planned router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedurePlan {
    /// Procedure key, the declared method name.
    pub name: String,
    /// Client method to delegate to.
    pub client_method: String,
    /// Input message identifier, aliased when its local name is ambiguous.
    pub input_type: String,
    /// Output message identifier.
    pub output_type: String,
    /// Query or mutation.
    pub kind: ProcedureKind,
}

/// Everything needed to render one router module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterPlan {
    /// Service name.
    pub service_name: String,
    /// Exported factory identifier.
    pub router_ident: String,
    /// Target file.
    pub file: PathBuf,
    /// Specifier of the `_connect` module, with `.js` suffix.
    pub service_import: String,
    /// Import clauses (`Order`, `Status as common_v1_Status`) grouped by
    /// specifier.
    pub type_imports: BTreeMap<String, BTreeSet<String>>,
    /// Procedures in method declaration order.
    pub procedures: Vec<ProcedurePlan>,
}

/// Derives the router plan for `service`.
pub fn plan_router(service: &ServiceDescriptor, layout: &OutputLayout, verbs: &VerbRules) -> RouterPlan {
    let file = layout.router_file(&service.name);
    let connect_module =
        naming::generated_module(&layout.connect_dir, &service.proto_file, CONNECT_SUFFIX);
    let service_import = format!(
        "{}.js",
        naming::relative_import(&layout.routers_dir, &connect_module)
    );

    let specifier_of = |message: &MessageRef| {
        naming::message_import(&layout.routers_dir, &layout.connect_dir, &message.proto_file)
    };

    // Local names exported by more than one module must be aliased.
    let mut origins: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for method in &service.methods {
        for message in [&method.input, &method.output] {
            origins
                .entry(message.local_name.as_str())
                .or_default()
                .insert(specifier_of(message));
        }
    }

    let mut type_imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut import_message = |message: &MessageRef| -> String {
        let clashes = origins
            .get(message.local_name.as_str())
            .is_some_and(|specifiers| specifiers.len() > 1);
        let (clause, ident) = if clashes {
            let alias = message.type_name.replace('.', "_");
            (format!("{} as {}", message.local_name, alias), alias)
        } else {
            (message.local_name.clone(), message.local_name.clone())
        };
        type_imports
            .entry(specifier_of(message))
            .or_default()
            .insert(clause);
        ident
    };

    let mut procedures = Vec::with_capacity(service.methods.len());
    for method in &service.methods {
        let input_type = import_message(&method.input);
        let output_type = import_message(&method.output);

        procedures.push(ProcedurePlan {
            name: method.name.clone(),
            client_method: naming::method_local_name(&method.name),
            input_type,
            output_type,
            kind: verbs.classify(&method.name),
        });
    }

    RouterPlan {
        service_name: service.name.clone(),
        router_ident: naming::router_ident(&service.name),
        file,
        service_import,
        type_imports,
        procedures,
    }
}

/// Renders a planned router module.
pub fn render_router(plan: &RouterPlan) -> String {
    let mut code = String::from(GENERATED_HEADER);
    code.push_str("import { createClient } from \"@connectrpc/connect\";\n");
    code.push_str("import { createConnectTransport } from \"@connectrpc/connect-web\";\n");
    code.push_str(&format!(
        "import {{ t, protobuf }} from \"../{}\";\n",
        ROUTER_FACTORY_MODULE
    ));
    code.push_str(&format!(
        "import {{ {} }} from \"{}\";\n",
        plan.service_name, plan.service_import
    ));
    for (specifier, names) in &plan.type_imports {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        code.push_str(&format!(
            "import type {{ {} }} from \"{}\";\n",
            names.join(", "),
            specifier
        ));
    }

    code.push_str(&format!(
        "\nexport const {} = (connectBaseUrl: string) => {{\n",
        plan.router_ident
    ));
    code.push_str("\tconst transport = createConnectTransport({ baseUrl: connectBaseUrl });\n");
    code.push_str(&format!(
        "\tconst client = createClient({}, transport);\n\n",
        plan.service_name
    ));
    code.push_str("\treturn t.router({\n");
    for procedure in &plan.procedures {
        code.push_str(&format!("\t\t{}: t.procedure\n", procedure.name));
        code.push_str(&format!(
            "\t\t\t.input(protobuf<{}>())\n",
            procedure.input_type
        ));
        code.push_str(&format!(
            "\t\t\t.output(protobuf<{}>())\n",
            procedure.output_type
        ));
        code.push_str(&format!(
            "\t\t\t.{}(async ({{ input }}) => client.{}(input)),\n",
            procedure.kind, procedure.client_method
        ));
    }
    code.push_str("\t});\n");
    code.push_str("};\n");
    code
}

/// Rejects services whose short names collide, since they would share one
/// aggregator field.
pub fn ensure_unique_short_names(services: &[ServiceDescriptor]) -> AppResult<()> {
    let mut seen: HashMap<&str, &ServiceDescriptor> = HashMap::new();
    for service in services {
        let short = naming::short_name(&service.name);
        if let Some(previous) = seen.insert(short, service) {
            return Err(AppError::DuplicateService(format!(
                "{} ({}) and {} ({}) both map to router field '{}'",
                previous.type_name, previous.proto_file, service.type_name, service.proto_file, short
            )));
        }
    }
    Ok(())
}

/// Writes one router per service, in order, and returns what was written.
pub fn emit_service_routers(
    services: &[ServiceDescriptor],
    layout: &OutputLayout,
    verbs: &VerbRules,
) -> AppResult<Vec<ServiceInfo>> {
    ensure_unique_short_names(services)?;

    let mut written = Vec::with_capacity(services.len());
    for service in services {
        let plan = plan_router(service, layout, verbs);
        write_file(&plan.file, &render_router(&plan))?;
        tracing::debug!(service = %service.type_name, procedures = plan.procedures.len(), "emitted router");

        written.push(ServiceInfo {
            import_path: naming::relative_import(&layout.trpc_dir, &layout.routers_dir.join(&plan.router_ident)),
            name: plan.service_name,
            file: plan.file,
        });
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MessageRef, MethodDescriptor};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn msg(name: &str, file: &str) -> MessageRef {
        MessageRef {
            type_name: format!("orders.v1.{}", name),
            local_name: name.to_string(),
            proto_file: file.to_string(),
        }
    }

    fn method(name: &str, input: MessageRef, output: MessageRef) -> MethodDescriptor {
        MethodDescriptor {
            name: name.to_string(),
            input,
            output,
            client_streaming: false,
            server_streaming: false,
        }
    }

    fn order_service() -> ServiceDescriptor {
        let file = "orders/v1/order.proto";
        ServiceDescriptor {
            name: "OrderService".into(),
            type_name: "orders.v1.OrderService".into(),
            proto_file: file.into(),
            methods: vec![
                method("GetOrder", msg("GetOrderRequest", file), msg("Order", file)),
                method("CreateOrder", msg("CreateOrderRequest", file), msg("Order", file)),
            ],
        }
    }

    #[test]
    fn test_plan_router() {
        let layout = OutputLayout::new(Path::new("/out"));
        let plan = plan_router(&order_service(), &layout, &VerbRules::default());

        assert_eq!(plan.router_ident, "OrderServiceRouter");
        assert_eq!(plan.file, PathBuf::from("/out/trpc/routers/OrderServiceRouter.ts"));
        assert_eq!(plan.service_import, "../../connect/orders/v1/order_connect.js");
        assert_eq!(plan.procedures[0].kind, ProcedureKind::Query);
        assert_eq!(plan.procedures[0].client_method, "getOrder");
        assert_eq!(plan.procedures[1].kind, ProcedureKind::Mutation);

        let names = &plan.type_imports["../../connect/orders/v1/order_pb.js"];
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["CreateOrderRequest", "GetOrderRequest", "Order"]);
    }

    #[test]
    fn test_render_router() {
        let layout = OutputLayout::new(Path::new("/out"));
        let plan = plan_router(&order_service(), &layout, &VerbRules::default());

        let expected = r#"// Code generated by proto-to-trpc. DO NOT EDIT.
import { createClient } from "@connectrpc/connect";
import { createConnectTransport } from "@connectrpc/connect-web";
import { t, protobuf } from "../routerFactory";
import { OrderService } from "../../connect/orders/v1/order_connect.js";
import type { CreateOrderRequest, GetOrderRequest, Order } from "../../connect/orders/v1/order_pb.js";

export const OrderServiceRouter = (connectBaseUrl: string) => {
	const transport = createConnectTransport({ baseUrl: connectBaseUrl });
	const client = createClient(OrderService, transport);

	return t.router({
		GetOrder: t.procedure
			.input(protobuf<GetOrderRequest>())
			.output(protobuf<Order>())
			.query(async ({ input }) => client.getOrder(input)),
		CreateOrder: t.procedure
			.input(protobuf<CreateOrderRequest>())
			.output(protobuf<Order>())
			.mutation(async ({ input }) => client.createOrder(input)),
	});
};
"#;
        assert_eq!(render_router(&plan), expected);
    }

    #[test]
    fn test_well_known_types_import_from_runtime() {
        let mut service = order_service();
        service.methods.push(method(
            "Ping",
            MessageRef {
                type_name: "google.protobuf.Empty".into(),
                local_name: "Empty".into(),
                proto_file: "google/protobuf/empty.proto".into(),
            },
            msg("Order", "orders/v1/order.proto"),
        ));
        let layout = OutputLayout::new(Path::new("/out"));
        let code = render_router(&plan_router(&service, &layout, &VerbRules::default()));

        assert!(code.contains("import type { Empty } from \"@bufbuild/protobuf\";"));
        assert!(code.contains(".mutation(async ({ input }) => client.ping(input))"));
    }

    #[test]
    fn test_same_local_name_from_two_files_is_aliased() {
        let common = MessageRef {
            type_name: "common.v1.Status".into(),
            local_name: "Status".into(),
            proto_file: "common/v1/status.proto".into(),
        };
        let mut service = order_service();
        service.methods = vec![
            method("GetStatus", msg("GetOrderRequest", "orders/v1/order.proto"), common),
            method("SetStatus", msg("Status", "orders/v1/order.proto"), msg("Order", "orders/v1/order.proto")),
        ];
        let layout = OutputLayout::new(Path::new("/out"));
        let plan = plan_router(&service, &layout, &VerbRules::default());

        assert_eq!(plan.procedures[0].output_type, "common_v1_Status");
        assert_eq!(plan.procedures[1].input_type, "orders_v1_Status");
        assert_eq!(plan.procedures[1].output_type, "Order");

        let code = render_router(&plan);
        assert!(code.contains(
            "import type { Status as common_v1_Status } from \"../../connect/common/v1/status_pb.js\";"
        ));
        assert!(code.contains(
            "import type { GetOrderRequest, Order, Status as orders_v1_Status } from \"../../connect/orders/v1/order_pb.js\";"
        ));
        assert!(code.contains(".output(protobuf<common_v1_Status>())"));
        assert!(code.contains(".input(protobuf<orders_v1_Status>())"));
        assert!(!code.contains("import type { Status }"));
    }

    #[test]
    fn test_duplicate_short_names_rejected() {
        let a = order_service();
        let mut b = order_service();
        b.name = "Order".into();
        b.type_name = "legacy.Order".into();

        let err = ensure_unique_short_names(&[a, b]).unwrap_err();
        assert!(matches!(err, AppError::DuplicateService(_)));
        assert!(format!("{}", err).contains("'Order'"));
    }

    #[test]
    fn test_emit_service_routers() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());

        let infos = emit_service_routers(&[order_service()], &layout, &VerbRules::default()).unwrap();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "OrderService");
        assert_eq!(infos[0].import_path, "./routers/OrderServiceRouter");
        let contents = fs::read_to_string(&infos[0].file).unwrap();
        assert!(contents.contains("export const OrderServiceRouter"));
    }

    #[test]
    fn test_emit_nothing_for_no_services() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let infos = emit_service_routers(&[], &layout, &VerbRules::default()).unwrap();
        assert!(infos.is_empty());
        assert!(!layout.routers_dir.exists());
    }
}
