use harvest_core::{display_value, Doc};

use crate::text::{self, Text};
use crate::Formatter;

/// Fallback for kinds without a dedicated formatter. Uses only the envelope plus a
/// one-level dump of `spec` and `status`.
pub struct GenericFormatter;

impl Formatter for GenericFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        t.field(0, "Kind", doc.kind());
        t.field(0, "Name", doc.name());
        match doc.namespace() {
            "" => t.field(0, "Scope", "Cluster-wide"),
            ns => t.field(0, "Namespace", ns),
        }
        t.field(0, "Created", doc.created());
        text::metadata(&mut t, doc);
        t.map_section("Spec", &doc.string_map_at(&["spec"]));
        t.map_section("Status", &doc.string_map_at(&["status"]));
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        let noun = docs.first().map(|d| d.kind()).filter(|k| !k.is_empty()).unwrap_or("resource");
        text::namespaced_list(docs, noun, "items", |t, d| {
            t.field(4, "Created", d.created());
            if let Some(status) = d.map_at(&["status"]) {
                for (k, v) in status.iter().filter(|(_, v)| !v.is_object() && !v.is_array()) {
                    t.field(4, k, display_value(v));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_envelope_renders() {
        let v = json!({"kind": "Widget", "metadata": {"name": "w"}});
        let out = GenericFormatter.render_one(Doc::new(&v));
        assert_eq!(out, "Kind: Widget\nName: w\nScope: Cluster-wide\nCreated: <unknown>");
    }

    #[test]
    fn one_level_dump_stringifies_nested_values() {
        let v = json!({"kind": "Widget", "metadata": {"name": "w", "namespace": "ns"},
                       "spec": {"size": 3, "enabled": true, "tags": ["a", "b"], "nested": {"x": {"y": 1}}},
                       "status": {"phase": "Ok"}});
        let out = GenericFormatter.render_one(Doc::new(&v));
        assert!(out.contains("Namespace: ns"));
        assert!(out.contains("Spec:\n  enabled: true\n  nested: {\"x\":{\"y\":1}}\n  size: 3\n  tags: [\"a\",\"b\"]"));
        assert!(out.contains("Status:\n  phase: Ok"));
    }

    #[test]
    fn list_shows_scalar_status_fields() {
        let v = json!({"kind": "Widget", "metadata": {"name": "w", "namespace": "ns"},
                       "status": {"phase": "Ok", "conditions": [{"type": "Ready"}]}});
        let out = GenericFormatter.render_many(&[Doc::new(&v)]);
        assert!(out.starts_with("Found 1 Widget(s):\n\nNamespace: ns (1 items)\n  • w\n    Created: <unknown>\n    phase: Ok"));
        assert!(!out.contains("conditions"));
    }
}
