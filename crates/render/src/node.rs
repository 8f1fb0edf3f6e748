use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

/// "Ready" iff a `Ready` condition reports "True".
pub fn node_status(doc: Doc<'_>) -> &'static str {
    let ready = doc
        .list_at(&["status", "conditions"])
        .iter()
        .any(|c| c.str_at(&["type"]) == "Ready" && c.str_at(&["status"]) == "True");
    if ready { "Ready" } else { "NotReady" }
}

/// Roles from `node-role.kubernetes.io/<role>` labels, sorted.
fn roles(doc: Doc<'_>) -> String {
    let roles: Vec<&str> = doc
        .labels()
        .into_keys()
        .filter_map(|k| k.strip_prefix("node-role.kubernetes.io/"))
        .filter(|r| !r.is_empty())
        .collect();
    roles.join(", ")
}

fn address(doc: Doc<'_>, kind: &str) -> String {
    doc.list_at(&["status", "addresses"])
        .iter()
        .find(|a| a.str_at(&["type"]) == kind)
        .map(|a| a.str_at(&["address"]).to_string())
        .unwrap_or_default()
}

pub struct NodeFormatter;

impl Formatter for NodeFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Node", doc, node_status(doc));
        t.field_nonempty(0, "Roles", &roles(doc));
        if doc.bool_at(&["spec", "unschedulable"]) == Some(true) {
            t.field(0, "Schedulable", false);
        }
        let addresses = doc.list_at(&["status", "addresses"]);
        if !addresses.is_empty() {
            t.heading("Addresses");
            for a in addresses {
                t.field(2, a.str_at(&["type"]), a.str_at(&["address"]));
            }
        }
        t.map_section("System Info", &doc.string_map_at(&["status", "nodeInfo"]));
        t.map_section("Capacity", &doc.string_map_at(&["status", "capacity"]));
        t.map_section("Allocatable", &doc.string_map_at(&["status", "allocatable"]));
        text::conditions(&mut t, &doc.list_at(&["status", "conditions"]));
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        let mut t = Text::new();
        text::count_line(&mut t, docs.len(), "node");
        t.blank();
        text::entries(&mut t, docs, &mut |t: &mut Text, d: Doc<'_>| {
            t.field(4, "Status", node_status(d));
            t.field_nonempty(4, "Roles", &roles(d));
            t.field_nonempty(4, "Internal IP", &address(d, "InternalIP"));
            t.field_nonempty(4, "Kubelet", d.str_at(&["status", "nodeInfo", "kubeletVersion"]));
            t.field_nonempty(4, "CPU", d.str_at(&["status", "allocatable", "cpu"]));
            t.field_nonempty(4, "Memory", d.str_at(&["status", "allocatable", "memory"]));
            t.field(4, "Created", d.created());
        });
        t.finish()
    }
}
