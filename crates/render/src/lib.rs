//! Harvest render: turns resource documents into text reports.
//!
//! Dispatch is by the document's declared `kind`, never by the name the caller used
//! to request it. Kinds without a registered formatter go through [`GenericFormatter`].

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use harvest_core::{Doc, ResourceType};
use serde_json::Value;
use tracing::debug;

pub mod text;

mod crd;
mod deployment;
mod generic;
mod image;
mod namespace;
mod network;
mod node;
mod pod;
mod service;
mod vm;
mod volume;

pub use crd::CrdFormatter;
pub use deployment::{DeploymentFormatter, DeploymentReplicas};
pub use generic::GenericFormatter;
pub use image::ImageFormatter;
pub use namespace::NamespaceFormatter;
pub use network::NetworkFormatter;
pub use node::{node_status, NodeFormatter};
pub use pod::{pod_status, PodFormatter};
pub use service::ServiceFormatter;
pub use vm::{vm_status, VmFormatter};
pub use volume::VolumeFormatter;

/// Renders documents of one kind. `render_many` is never called with an empty slice
/// by the registry.
pub trait Formatter: Send + Sync {
    fn render_one(&self, doc: Doc<'_>) -> String;

    fn render_many(&self, docs: &[Doc<'_>]) -> String;
}

/// Kind name to formatter table, populated at startup and read-only afterwards.
#[derive(Clone)]
pub struct FormatterRegistry {
    by_kind: HashMap<String, Arc<dyn Formatter>>,
    fallback: Arc<dyn Formatter>,
}

impl Default for FormatterRegistry {
    fn default() -> Self { Self::new() }
}

impl FormatterRegistry {
    /// Empty table; everything renders through the fallback.
    pub fn new() -> Self { Self { by_kind: HashMap::new(), fallback: Arc::new(GenericFormatter) } }

    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register("Pod", PodFormatter);
        reg.register("Service", ServiceFormatter);
        reg.register("Namespace", NamespaceFormatter);
        reg.register("Node", NodeFormatter);
        reg.register("Deployment", DeploymentFormatter);
        reg.register("VirtualMachine", VmFormatter);
        reg.register("Volume", VolumeFormatter);
        reg.register("Network", NetworkFormatter);
        reg.register("VirtualMachineImage", ImageFormatter);
        reg.register("CustomResourceDefinition", CrdFormatter);
        reg
    }

    /// Bind `kind` to `formatter`, returning the binding it replaces.
    pub fn register<F: Formatter + 'static>(&mut self, kind: &str, formatter: F) -> Option<Arc<dyn Formatter>> {
        self.by_kind.insert(kind.to_string(), Arc::new(formatter))
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Formatter> { self.by_kind.get(kind).map(|f| f.as_ref()) }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.by_kind.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    fn resolve(&self, kind: &str) -> &dyn Formatter {
        match self.get(kind) {
            Some(f) => f,
            None => {
                debug!(kind = %kind, "render: no formatter, using generic");
                self.fallback.as_ref()
            }
        }
    }

    pub fn render_one(&self, doc: &Value) -> String {
        let doc = Doc::new(doc);
        self.resolve(doc.kind()).render_one(doc)
    }

    /// Render a collection, dispatching on the first item's kind. An empty collection
    /// yields `ty`'s "none found" message without touching any formatter.
    pub fn render_many(&self, docs: &[Value], ty: &ResourceType) -> String {
        let Some(first) = docs.first() else {
            return ty.empty_message();
        };
        let docs: Vec<Doc<'_>> = docs.iter().map(Doc::new).collect();
        self.resolve(Doc::new(first).kind()).render_many(&docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{NODE, POD};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl Formatter for Counting {
        fn render_one(&self, _doc: Doc<'_>) -> String {
            self.0.fetch_add(1, Ordering::SeqCst);
            "one".into()
        }
        fn render_many(&self, docs: &[Doc<'_>]) -> String {
            self.0.fetch_add(1, Ordering::SeqCst);
            format!("many:{}", docs.len())
        }
    }

    #[test]
    fn empty_collection_skips_formatters() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut reg = FormatterRegistry::new();
        reg.register("Pod", Counting(hits.clone()));
        assert_eq!(reg.render_many(&[], &POD), "No pods found in the specified namespace(s).");
        assert_eq!(reg.render_many(&[], &NODE), "No nodes found.");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_uses_declared_kind_of_first_item() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut reg = FormatterRegistry::new();
        reg.register("Pod", Counting(hits.clone()));
        let docs = vec![json!({"kind": "Pod"}), json!({"kind": "Other"})];
        assert_eq!(reg.render_many(&docs, &NODE), "many:2");
        assert_eq!(reg.render_one(&json!({"kind": "Pod"})), "one");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn register_replaces_existing_binding() {
        let mut reg = FormatterRegistry::builtin();
        assert!(reg.register("Pod", GenericFormatter).is_some());
        assert!(reg.register("Widget", GenericFormatter).is_none());
        assert_eq!(reg.kinds().len(), 11);
    }

    #[test]
    fn unknown_kind_falls_back() {
        let reg = FormatterRegistry::builtin();
        let out = reg.render_one(&json!({"kind": "Widget", "metadata": {"name": "w1"}}));
        assert!(out.contains("Kind: Widget"));
        assert!(out.contains("w1"));
    }
}
