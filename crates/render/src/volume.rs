use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct VolumeFormatter;

impl Formatter for VolumeFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Volume", doc, doc.str_at(&["status", "state"]));
        t.field_nonempty(0, "Size", &doc.display_at(&["spec", "size"]));
        t.field_nonempty(0, "Storage Class", doc.str_at(&["spec", "storageClassName"]));
        let modes = doc.strings_at(&["spec", "accessModes"]);
        if !modes.is_empty() {
            t.field(0, "Access Modes", modes.join(", "));
        }
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "volume", "volumes", |t, d| {
            t.field_nonempty(4, "Status", d.str_at(&["status", "state"]));
            t.field_nonempty(4, "Size", &d.display_at(&["spec", "size"]));
            t.field(4, "Created", d.created());
        })
    }
}
