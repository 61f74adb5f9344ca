//! Emits `<stem>_connectquery.ts` next to each generated `_connect` module,
//! exporting one method descriptor per RPC in the shape connect-query
//! hooks expect (`{ ...method, service }`).

use super::{write_file, GENERATED_HEADER};
use crate::descriptor::ServiceDescriptor;
use crate::error::AppResult;
use crate::naming::{self, OutputLayout, CONNECTQUERY_SUFFIX, CONNECT_SUFFIX, SOURCE_EXT};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Renders the connect-query module for the services of one definition file.
///
/// `proto_file` names the file; only its stem is used for the import.
pub fn render_connectquery(proto_file: &str, services: &[&ServiceDescriptor]) -> String {
    let stem = Path::new(proto_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
    let mut code = String::from(GENERATED_HEADER);
    code.push_str(&format!(
        "import {{ {} }} from \"./{}{}.js\";\n",
        names.join(", "),
        stem,
        CONNECT_SUFFIX
    ));

    // A method name shared by several services would export the same
    // binding twice; those exports are qualified with the service name.
    let mut uses: HashMap<String, usize> = HashMap::new();
    for service in services {
        for method in &service.methods {
            *uses.entry(naming::method_local_name(&method.name)).or_default() += 1;
        }
    }

    for service in services {
        for method in &service.methods {
            let local = naming::method_local_name(&method.name);
            let export = if uses.get(&local).copied().unwrap_or(0) > 1 {
                format!("{}_{}", service.name, local)
            } else {
                naming::safe_identifier(&local)
            };
            code.push_str(&format!("\nexport const {} = {{\n", export));
            code.push_str(&format!("\t...{}.methods.{},\n", service.name, local));
            code.push_str(&format!("\tservice: {},\n", service.name));
            code.push_str("} as const;\n");
        }
    }
    code
}

/// Writes one connect-query module per definition file that declares
/// services, and returns the written paths.
pub fn emit_connectquery(services: &[ServiceDescriptor], layout: &OutputLayout) -> AppResult<Vec<PathBuf>> {
    // Group by declaring file, keeping first-seen order.
    let mut groups: Vec<(&str, Vec<&ServiceDescriptor>)> = Vec::new();
    for service in services {
        match groups.iter_mut().find(|(file, _)| *file == service.proto_file) {
            Some((_, members)) => members.push(service),
            None => groups.push((service.proto_file.as_str(), vec![service])),
        }
    }

    let mut written = Vec::with_capacity(groups.len());
    for (proto_file, members) in groups {
        let mut path = naming::generated_module(&layout.connect_dir, proto_file, CONNECTQUERY_SUFFIX)
            .into_os_string();
        path.push(format!(".{}", SOURCE_EXT));
        let path = PathBuf::from(path);
        write_file(&path, &render_connectquery(proto_file, &members))?;
        written.push(path);
    }
    Ok(written)
}
