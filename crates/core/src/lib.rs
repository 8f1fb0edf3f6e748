//! Harvest core types: resource type identifiers, the friendly-name registry and
//! schema-agnostic document accessors.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

pub mod doc;

pub use doc::{display_value, format_timestamp, Doc};

/// Fully-qualified resource type: `(group, version, plural)` plus the display data
/// needed to talk about it.
///
/// Identity is the `(group, version, plural)` triple; `kind` is the object kind the
/// platform reports for items of this type, used to fill list items that arrive
/// without their type header.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceType {
    pub group: &'static str,
    pub version: &'static str,
    pub plural: &'static str,
    pub kind: &'static str,
    /// Statically known scope; the discovery query is authoritative.
    pub namespaced: bool,
    /// Human noun, singular ("virtual machine").
    pub noun: &'static str,
    /// Human noun, plural ("virtual machines").
    pub noun_plural: &'static str,
}

impl ResourceType {
    /// `v1` for the core group, `group/version` otherwise.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() { self.version.to_string() } else { format!("{}/{}", self.group, self.version) }
    }

    /// Stable key: `version/plural` for the core group, `group/version/plural` otherwise.
    pub fn gvr_key(&self) -> String {
        if self.group.is_empty() {
            format!("{}/{}", self.version, self.plural)
        } else {
            format!("{}/{}/{}", self.group, self.version, self.plural)
        }
    }

    /// Message rendered for an empty list result.
    pub fn empty_message(&self) -> String {
        if self.namespaced {
            format!("No {} found in the specified namespace(s).", self.noun_plural)
        } else {
            format!("No {} found.", self.noun_plural)
        }
    }

    fn identity(&self) -> (&'static str, &'static str, &'static str) {
        (self.group, self.version, self.plural)
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool { self.identity() == other.identity() }
}

impl Eq for ResourceType {}

impl std::hash::Hash for ResourceType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.identity().hash(state) }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.gvr_key()) }
}

/// One registry row: a canonical friendly name, its aliases and the type they resolve to.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub ty: ResourceType,
}

pub const POD: ResourceType = ResourceType {
    group: "", version: "v1", plural: "pods", kind: "Pod", namespaced: true, noun: "pod", noun_plural: "pods",
};
pub const SERVICE: ResourceType = ResourceType {
    group: "", version: "v1", plural: "services", kind: "Service", namespaced: true, noun: "service", noun_plural: "services",
};
pub const NAMESPACE: ResourceType = ResourceType {
    group: "", version: "v1", plural: "namespaces", kind: "Namespace", namespaced: false, noun: "namespace", noun_plural: "namespaces",
};
pub const NODE: ResourceType = ResourceType {
    group: "", version: "v1", plural: "nodes", kind: "Node", namespaced: false, noun: "node", noun_plural: "nodes",
};
pub const DEPLOYMENT: ResourceType = ResourceType {
    group: "apps", version: "v1", plural: "deployments", kind: "Deployment", namespaced: true, noun: "deployment", noun_plural: "deployments",
};
pub const CRD: ResourceType = ResourceType {
    group: "apiextensions.k8s.io",
    version: "v1",
    plural: "customresourcedefinitions",
    kind: "CustomResourceDefinition",
    namespaced: false,
    noun: "custom resource definition",
    noun_plural: "custom resource definitions",
};
pub const VIRTUAL_MACHINE: ResourceType = ResourceType {
    group: "kubevirt.io",
    version: "v1",
    plural: "virtualmachines",
    kind: "VirtualMachine",
    namespaced: true,
    noun: "virtual machine",
    noun_plural: "virtual machines",
};
pub const VOLUME: ResourceType = ResourceType {
    group: "storage.harvesterhci.io", version: "v1beta1", plural: "volumes", kind: "Volume", namespaced: true, noun: "volume", noun_plural: "volumes",
};
pub const NETWORK: ResourceType = ResourceType {
    group: "network.harvesterhci.io", version: "v1beta1", plural: "networks", kind: "Network", namespaced: true, noun: "network", noun_plural: "networks",
};
pub const VM_IMAGE: ResourceType = ResourceType {
    group: "harvesterhci.io",
    version: "v1beta1",
    plural: "virtualmachineimages",
    kind: "VirtualMachineImage",
    namespaced: true,
    noun: "VM image",
    noun_plural: "VM images",
};

/// Built-in friendly names. Each type is listed once; every alias resolves to it.
pub const BUILTIN_TYPES: &[TypeEntry] = &[
    TypeEntry { name: "pod", aliases: &["pods"], ty: POD },
    TypeEntry { name: "deployment", aliases: &["deployments"], ty: DEPLOYMENT },
    TypeEntry { name: "service", aliases: &["services"], ty: SERVICE },
    TypeEntry { name: "namespace", aliases: &["namespaces"], ty: NAMESPACE },
    TypeEntry { name: "node", aliases: &["nodes"], ty: NODE },
    TypeEntry { name: "crd", aliases: &["crds", "customresourcedefinition", "customresourcedefinitions"], ty: CRD },
    TypeEntry { name: "vm", aliases: &["vms", "virtualmachine", "virtualmachines"], ty: VIRTUAL_MACHINE },
    TypeEntry { name: "volume", aliases: &["volumes"], ty: VOLUME },
    TypeEntry { name: "network", aliases: &["networks"], ty: NETWORK },
    TypeEntry { name: "image", aliases: &["images", "vmimage", "vmimages"], ty: VM_IMAGE },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("friendly name already registered: {0}")]
    DuplicateName(String),
    #[error("resource type already registered: {0}")]
    DuplicateType(String),
}

/// Bidirectional mapping between friendly names and resource types.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, ResourceType>,
    canonical: HashMap<ResourceType, &'static str>,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry holding [`BUILTIN_TYPES`].
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for entry in BUILTIN_TYPES {
            reg.insert(entry);
        }
        reg
    }

    /// Build a registry from custom entries, rejecting any name or type seen twice.
    pub fn from_entries(entries: &[TypeEntry]) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        for entry in entries {
            reg.register(*entry)?;
        }
        Ok(reg)
    }

    pub fn register(&mut self, entry: TypeEntry) -> Result<(), RegistryError> {
        if self.canonical.contains_key(&entry.ty) {
            return Err(RegistryError::DuplicateType(entry.ty.gvr_key()));
        }
        for name in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
            if self.by_name.contains_key(&normalize(name)) {
                return Err(RegistryError::DuplicateName((*name).to_string()));
            }
        }
        self.insert(&entry);
        Ok(())
    }

    fn insert(&mut self, entry: &TypeEntry) {
        self.canonical.insert(entry.ty, entry.name);
        for name in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
            self.by_name.insert(normalize(name), entry.ty);
        }
    }

    /// Resolve a friendly name (case-insensitive, surrounding whitespace ignored).
    pub fn resolve(&self, friendly: &str) -> Option<&ResourceType> {
        self.by_name.get(&normalize(friendly))
    }

    /// Canonical friendly name for a type. Display only; never used for dispatch.
    pub fn friendly_name(&self, ty: &ResourceType) -> Option<&'static str> {
        self.canonical.get(ty).copied()
    }

    pub fn len(&self) -> usize { self.canonical.len() }

    pub fn is_empty(&self) -> bool { self.canonical.is_empty() }
}

fn normalize(name: &str) -> String { name.trim().to_ascii_lowercase() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_and_plural_resolve_to_same_type() {
        let reg = TypeRegistry::builtin();
        for (one, many) in [
            ("pod", "pods"),
            ("deployment", "deployments"),
            ("service", "services"),
            ("namespace", "namespaces"),
            ("node", "nodes"),
            ("crd", "crds"),
            ("vm", "vms"),
            ("volume", "volumes"),
            ("network", "networks"),
            ("image", "images"),
        ] {
            let a = reg.resolve(one).expect(one);
            let b = reg.resolve(many).expect(many);
            assert_eq!(a, b, "{} vs {}", one, many);
            assert!(!a.plural.is_empty() && !a.version.is_empty());
        }
    }

    #[test]
    fn builtin_table_has_no_duplicates() {
        let reg = TypeRegistry::from_entries(BUILTIN_TYPES).expect("builtin table consistent");
        assert_eq!(reg.len(), BUILTIN_TYPES.len());
        let mut keys: Vec<_> = BUILTIN_TYPES.iter().map(|e| e.ty.gvr_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), BUILTIN_TYPES.len());
    }

    #[test]
    fn reverse_lookup_is_canonical_name() {
        let reg = TypeRegistry::builtin();
        assert_eq!(reg.friendly_name(&VIRTUAL_MACHINE), Some("vm"));
        assert_eq!(reg.friendly_name(&POD), Some("pod"));
    }

    #[test]
    fn resolve_ignores_case_and_whitespace() {
        let reg = TypeRegistry::builtin();
        assert_eq!(reg.resolve("  Pods ").map(|t| t.plural), Some("pods"));
        assert!(reg.resolve("configmap").is_none());
        assert!(reg.resolve("").is_none());
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut reg = TypeRegistry::builtin();
        let dup_name = TypeEntry { name: "pod", aliases: &[], ty: ResourceType { plural: "pods2", ..POD } };
        assert_eq!(reg.register(dup_name), Err(RegistryError::DuplicateName("pod".into())));
        let dup_type = TypeEntry { name: "po", aliases: &[], ty: POD };
        assert!(matches!(reg.register(dup_type), Err(RegistryError::DuplicateType(_))));
    }

    #[test]
    fn keys_and_messages() {
        assert_eq!(POD.gvr_key(), "v1/pods");
        assert_eq!(DEPLOYMENT.api_version(), "apps/v1");
        assert_eq!(POD.empty_message(), "No pods found in the specified namespace(s).");
        assert_eq!(NODE.empty_message(), "No nodes found.");
    }
}
