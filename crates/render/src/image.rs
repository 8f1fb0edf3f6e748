use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

pub struct ImageFormatter;

/// Display name, falling back to the download URL.
fn source<'a>(doc: Doc<'a>) -> &'a str {
    match doc.str_at(&["spec", "displayName"]) {
        "" => doc.str_at(&["spec", "url"]),
        name => name,
    }
}

impl Formatter for ImageFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "VM Image", doc, "");
        t.field_nonempty(0, "Display Name", doc.str_at(&["spec", "displayName"]));
        t.field_nonempty(0, "Source Type", doc.str_at(&["spec", "sourceType"]));
        t.field_nonempty(0, "URL", doc.str_at(&["spec", "url"]));
        t.field_nonempty(0, "Description", doc.str_at(&["spec", "description"]));
        if doc.map_at(&["status"]).is_some() {
            t.heading("Status");
            t.field_nonempty(2, "State", doc.str_at(&["status", "state"]));
            t.field_nonempty(2, "Progress", &doc.display_at(&["status", "progress"]));
            t.field_nonempty(2, "Size", &doc.display_at(&["status", "size"]));
        }
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "VM image", "images", |t, d| {
            t.field_nonempty(4, "Source", source(d));
            t.field_nonempty(4, "Size", &d.display_at(&["status", "size"]));
            t.field_nonempty(4, "Progress", &d.display_at(&["status", "progress"]));
            t.field(4, "Created", d.created());
        })
    }
}
