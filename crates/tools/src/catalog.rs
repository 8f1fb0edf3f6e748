//! Named tool operations and their parameter schemas.

use harvest_core::{ResourceType, TypeRegistry};
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    List,
    Get,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: String,
    /// Friendly resource type name the tool operates on.
    pub resource: &'static str,
    pub verb: Verb,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    /// JSON schema object for the tool's arguments (all string-typed).
    pub fn input_schema(&self) -> Value {
        let mut props = Map::new();
        for p in &self.params {
            props.insert(p.name.to_string(), json!({"type": "string", "description": p.description}));
        }
        let required: Vec<&str> = self.params.iter().filter(|p| p.required).map(|p| p.name).collect();
        json!({"type": "object", "properties": props, "required": required})
    }
}

/// `(tool name, friendly type, verb)` for every exposed operation.
pub const TOOLS: &[(&str, &str, Verb)] = &[
    ("list_pods", "pod", Verb::List),
    ("get_pod", "pod", Verb::Get),
    ("delete_pod", "pod", Verb::Delete),
    ("list_deployments", "deployment", Verb::List),
    ("get_deployment", "deployment", Verb::Get),
    ("list_services", "service", Verb::List),
    ("get_service", "service", Verb::Get),
    ("list_namespaces", "namespace", Verb::List),
    ("get_namespace", "namespace", Verb::Get),
    ("list_nodes", "node", Verb::List),
    ("get_node", "node", Verb::Get),
    ("list_crds", "crd", Verb::List),
    ("list_vms", "vm", Verb::List),
    ("get_vm", "vm", Verb::Get),
    ("list_images", "image", Verb::List),
    ("list_volumes", "volume", Verb::List),
    ("list_networks", "network", Verb::List),
];

fn spec_for(name: &'static str, resource: &'static str, verb: Verb, ty: &ResourceType) -> ToolSpec {
    let (one, many) = (ty.noun, ty.noun_plural);
    let mut params = Vec::new();
    let description = match verb {
        Verb::List => {
            if ty.namespaced {
                params.push(ParamSpec {
                    name: "namespace",
                    description: format!("The namespace to list {} from (optional, defaults to all namespaces)", many),
                    required: false,
                });
            }
            format!("List {} in the Harvester cluster", many)
        }
        Verb::Get | Verb::Delete => {
            if ty.namespaced {
                params.push(ParamSpec { name: "namespace", description: format!("The namespace of the {}", one), required: true });
            }
            let what = if verb == Verb::Delete { format!("The name of the {} to delete", one) } else { format!("The name of the {}", one) };
            params.push(ParamSpec { name: "name", description: what, required: true });
            if verb == Verb::Delete {
                format!("Delete a {} from the Harvester cluster", one)
            } else {
                format!("Get {} details from the Harvester cluster", one)
            }
        }
    };
    ToolSpec { name, description, resource, verb, params }
}

/// Build the catalog against `types`. Entries whose friendly name is missing from
/// the registry are left out.
pub fn catalog(types: &TypeRegistry) -> Vec<ToolSpec> {
    TOOLS
        .iter()
        .filter_map(|&(name, resource, verb)| types.resolve(resource).map(|ty| spec_for(name, resource, verb, ty)))
        .collect()
}
