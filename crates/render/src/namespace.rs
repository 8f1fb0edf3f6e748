use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct NamespaceFormatter;

const BUCKETS: [&str; 3] = ["Active", "Terminating", "Other"];

fn bucket(phase: &str) -> usize {
    match phase {
        "Active" => 0,
        "Terminating" => 1,
        _ => 2,
    }
}

impl Formatter for NamespaceFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Namespace", doc, doc.str_at(&["status", "phase"]));
        let finalizers = doc.strings_at(&["spec", "finalizers"]);
        if !finalizers.is_empty() {
            t.field(0, "Finalizers", finalizers.join(", "));
        }
        text::conditions(&mut t, &doc.list_at(&["status", "conditions"]));
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        let mut groups: [Vec<Doc<'_>>; 3] = Default::default();
        for d in docs {
            groups[bucket(d.str_at(&["status", "phase"]))].push(*d);
        }
        let mut t = Text::new();
        text::count_line(&mut t, docs.len(), "namespace");
        for (title, items) in BUCKETS.iter().zip(groups.iter()) {
            if items.is_empty() {
                continue;
            }
            t.blank();
            t.line(0, format_args!("{} ({}):", title, items.len()));
            text::entries(&mut t, items, &mut |t: &mut Text, d: Doc<'_>| {
                if *title == "Other" {
                    t.field_nonempty(4, "Phase", d.str_at(&["status", "phase"]));
                }
                t.field(4, "Created", d.created());
            });
        }
        t.finish()
    }
}
