use std::collections::BTreeMap;

use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct CrdFormatter;

fn group_of<'a>(doc: Doc<'a>) -> &'a str {
    match doc.str_at(&["spec", "group"]) {
        "" => "core",
        g => g,
    }
}

impl Formatter for CrdFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Custom Resource Definition", doc, "");
        t.field(0, "Group", doc.str_at(&["spec", "group"]));
        t.field(0, "Kind", doc.str_at(&["spec", "names", "kind"]));
        t.field(0, "Plural", doc.str_at(&["spec", "names", "plural"]));
        t.field(0, "Scope", doc.str_at(&["spec", "scope"]));
        let short = doc.strings_at(&["spec", "names", "shortNames"]);
        if !short.is_empty() {
            t.field(0, "Short Names", short.join(", "));
        }
        let versions = doc.list_at(&["spec", "versions"]);
        if !versions.is_empty() {
            t.heading("Versions");
            for v in versions {
                t.line(2, format_args!("{}:", v.str_at(&["name"])));
                t.field(4, "Served", v.bool_at(&["served"]).unwrap_or(false));
                t.field(4, "Storage", v.bool_at(&["storage"]).unwrap_or(false));
                if v.map_at(&["schema", "openAPIV3Schema"]).is_some() {
                    t.field(4, "Schema", "Available");
                }
            }
        }
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        let mut groups: BTreeMap<&str, Vec<Doc<'_>>> = BTreeMap::new();
        for d in docs {
            groups.entry(group_of(*d)).or_default().push(*d);
        }
        let mut t = Text::new();
        text::count_line(&mut t, docs.len(), "custom resource definition");
        for (group, items) in &groups {
            t.blank();
            t.line(0, format_args!("Group: {} ({} CRDs)", group, items.len()));
            text::entries(&mut t, items, &mut |t: &mut Text, d: Doc<'_>| {
                t.field(4, "Kind", d.str_at(&["spec", "names", "kind"]));
                t.field(4, "Plural", d.str_at(&["spec", "names", "plural"]));
                let versions = d.list_at(&["spec", "versions"]);
                if !versions.is_empty() {
                    t.line(4, "Versions:");
                    for v in versions {
                        t.line(
                            6,
                            format_args!(
                                "{} (served: {}, storage: {})",
                                v.str_at(&["name"]),
                                v.bool_at(&["served"]).unwrap_or(false),
                                v.bool_at(&["storage"]).unwrap_or(false)
                            ),
                        );
                    }
                }
                t.field(4, "Created", d.created());
            });
        }
        t.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn crd(name: &str, group: &str) -> serde_json::Value {
        json!({"kind": "CustomResourceDefinition", "metadata": {"name": name},
               "spec": {"group": group, "names": {"kind": "K", "plural": "ks"}, "scope": "Namespaced",
                        "versions": [{"name": "v1", "served": true, "storage": true, "schema": {"openAPIV3Schema": {"type": "object"}}}]}})
    }

    #[test]
    fn list_groups_by_api_group_with_core_fallback() {
        let v = vec![crd("b.kubevirt.io", "kubevirt.io"), crd("x", ""), crd("a.harvesterhci.io", "harvesterhci.io")];
        let docs: Vec<_> = v.iter().map(Doc::new).collect();
        let out = CrdFormatter.render_many(&docs);
        let h = out.find("Group: harvesterhci.io (1 CRDs)").unwrap();
        let k = out.find("Group: kubevirt.io (1 CRDs)").unwrap();
        let c = out.find("Group: core (1 CRDs)").unwrap();
        assert!(c < h && h < k);
        assert!(out.contains("      v1 (served: true, storage: true)"));
    }

    #[test]
    fn detail_marks_schema() {
        let v = crd("vms.kubevirt.io", "kubevirt.io");
        let out = CrdFormatter.render_one(Doc::new(&v));
        assert!(out.starts_with("Custom Resource Definition: vms.kubevirt.io\nCreated: <unknown>\nGroup: kubevirt.io\n"));
        assert!(out.contains("Versions:\n  v1:\n    Served: true\n    Storage: true\n    Schema: Available"));
    }
}
