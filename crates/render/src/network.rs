use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct NetworkFormatter;

impl Formatter for NetworkFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Network", doc, "");
        t.field_nonempty(0, "Type", doc.str_at(&["spec", "type"]));
        t.map_section("Configuration", &doc.string_map_at(&["spec", "config"]));
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "network", "networks", |t, d| {
            t.field_nonempty(4, "Type", d.str_at(&["spec", "type"]));
            if let Some(vlan) = d.i64_at(&["spec", "config", "vlan"]).filter(|v| *v > 0) {
                t.field(4, "VLAN ID", vlan);
            }
            t.field(4, "Created", d.created());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_keys_sorted_and_vlan_in_list() {
        let v = json!({"kind": "Network", "metadata": {"name": "vlan100", "namespace": "default"},
                       "spec": {"type": "L2VlanNetwork", "config": {"vlan": 100, "bridge": "mgmt-br"}}});
        let out = NetworkFormatter.render_one(Doc::new(&v));
        assert!(out.contains("Type: L2VlanNetwork\n\nConfiguration:\n  bridge: mgmt-br\n  vlan: 100"));
        let out = NetworkFormatter.render_many(&[Doc::new(&v)]);
        assert!(out.contains("    VLAN ID: 100"));
    }
}
