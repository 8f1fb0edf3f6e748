use std::fmt;

use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

/// Replica counts, each 0 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeploymentReplicas {
    pub desired: i64,
    pub updated: i64,
    pub total: i64,
    pub available: i64,
    pub ready: i64,
}

impl DeploymentReplicas {
    pub fn of(doc: Doc<'_>) -> Self {
        let n = |path: &[&str]| doc.i64_at(path).unwrap_or(0);
        Self {
            desired: n(&["spec", "replicas"]),
            updated: n(&["status", "updatedReplicas"]),
            total: n(&["status", "replicas"]),
            available: n(&["status", "availableReplicas"]),
            ready: n(&["status", "readyReplicas"]),
        }
    }
}

impl fmt::Display for DeploymentReplicas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} desired | {} updated | {} total | {} available | {} ready",
            self.desired, self.updated, self.total, self.available, self.ready
        )
    }
}

pub struct DeploymentFormatter;

impl Formatter for DeploymentFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        t.field(0, "Deployment", doc.name());
        t.field_nonempty(0, "Namespace", doc.namespace());
        t.field(0, "Replicas", DeploymentReplicas::of(doc));
        t.field(0, "Created", doc.created());
        t.field_nonempty(0, "Strategy", doc.str_at(&["spec", "strategy", "type"]));
        t.map_section("Selector", &doc.string_map_at(&["spec", "selector", "matchLabels"]));
        let pod = doc.at(&["spec", "template"]);
        text::containers(&mut t, &pod.list_at(&["spec", "containers"]), &[]);
        text::conditions(&mut t, &doc.list_at(&["status", "conditions"]));
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "deployment", "deployments", |t, d| {
            let r = DeploymentReplicas::of(d);
            t.line(4, format_args!("Ready: {}/{}", r.ready, r.desired));
            t.field(4, "Up-to-date", r.updated);
            t.field(4, "Available", r.available);
            let images: Vec<&str> = d
                .list_at(&["spec", "template", "spec", "containers"])
                .iter()
                .map(|c| c.str_at(&["image"]))
                .filter(|i| !i.is_empty())
                .collect();
            if !images.is_empty() {
                t.field(4, "Images", images.join(", "));
            }
            t.field(4, "Created", d.created());
        })
    }
}
