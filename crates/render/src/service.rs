use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct ServiceFormatter;

/// `http:80 → 8080/TCP`, or `80 → 8080/TCP` for an unnamed port.
fn port_line(p: Doc<'_>) -> String {
    let mut s = String::new();
    let name = p.str_at(&["name"]);
    if !name.is_empty() {
        s.push_str(name);
        s.push(':');
    }
    s.push_str(&p.display_at(&["port"]));
    let target = p.display_at(&["targetPort"]);
    if !target.is_empty() {
        s.push_str(" → ");
        s.push_str(&target);
    }
    let proto = p.str_at(&["protocol"]);
    if !proto.is_empty() {
        s.push('/');
        s.push_str(proto);
    }
    if let Some(node_port) = p.i64_at(&["nodePort"]) {
        s.push_str(&format!(" (node port {})", node_port));
    }
    s
}

impl Formatter for ServiceFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Service", doc, "");
        t.field_nonempty(0, "Type", doc.str_at(&["spec", "type"]));
        t.field_nonempty(0, "Cluster IP", doc.str_at(&["spec", "clusterIP"]));
        let external = doc.strings_at(&["spec", "externalIPs"]);
        if !external.is_empty() {
            t.field(0, "External IPs", external.join(", "));
        }
        let ingress: Vec<String> = doc
            .list_at(&["status", "loadBalancer", "ingress"])
            .iter()
            .map(|i| match i.str_at(&["ip"]) {
                "" => i.str_at(&["hostname"]).to_string(),
                ip => ip.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect();
        if !ingress.is_empty() {
            t.field(0, "Load Balancer", ingress.join(", "));
        }
        t.map_section("Selector", &doc.string_map_at(&["spec", "selector"]));
        let ports = doc.list_at(&["spec", "ports"]);
        if !ports.is_empty() {
            t.heading("Ports");
            for p in ports {
                t.line(2, port_line(p));
            }
        }
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "service", "services", |t, d| {
            t.field_nonempty(4, "Type", d.str_at(&["spec", "type"]));
            t.field_nonempty(4, "Cluster IP", d.str_at(&["spec", "clusterIP"]));
            let ports = d.list_at(&["spec", "ports"]);
            if !ports.is_empty() {
                t.line(4, "Ports:");
                for p in ports {
                    t.line(6, port_line(p));
                }
            }
            t.field(4, "Created", d.created());
        })
    }
}
