//! Text building blocks shared by the formatters.

use std::collections::BTreeMap;
use std::fmt::Display;

use harvest_core::Doc;

/// Line-oriented text buffer. Blank lines never stack and trailing whitespace is
/// dropped on [`Text::finish`].
#[derive(Debug, Default)]
pub struct Text {
    buf: String,
}

impl Text {
    pub fn new() -> Self { Self::default() }

    pub fn line(&mut self, indent: usize, s: impl Display) {
        self.buf.extend(std::iter::repeat(' ').take(indent));
        self.buf.push_str(&s.to_string());
        self.buf.push('\n');
    }

    pub fn field(&mut self, indent: usize, key: &str, value: impl Display) {
        self.line(indent, format_args!("{}: {}", key, value));
    }

    /// Like [`Text::field`] but skipped when `value` is empty.
    pub fn field_nonempty(&mut self, indent: usize, key: &str, value: &str) {
        if !value.is_empty() {
            self.field(indent, key, value);
        }
    }

    pub fn blank(&mut self) {
        if !self.buf.is_empty() && !self.buf.ends_with("\n\n") {
            self.buf.push('\n');
        }
    }

    /// Blank line, then `Title:`.
    pub fn heading(&mut self, title: &str) {
        self.blank();
        self.line(0, format_args!("{}:", title));
    }

    pub fn pairs(&mut self, indent: usize, map: &BTreeMap<&str, String>) {
        for (k, v) in map {
            self.field(indent, k, v);
        }
    }

    /// Heading plus sorted `key: value` lines; omitted entirely when `map` is empty.
    pub fn map_section(&mut self, title: &str, map: &BTreeMap<&str, String>) {
        if map.is_empty() {
            return;
        }
        self.heading(title);
        self.pairs(2, map);
    }

    pub fn finish(self) -> String {
        let mut s = self.buf;
        s.truncate(s.trim_end().len());
        s
    }
}

/// Header, namespace (when set), status (when known) and creation time.
pub fn envelope(t: &mut Text, header: &str, doc: Doc<'_>, status: &str) {
    t.field(0, header, doc.name());
    t.field_nonempty(0, "Namespace", doc.namespace());
    t.field_nonempty(0, "Status", status);
    t.field(0, "Created", doc.created());
}

/// Labels and annotations sections.
pub fn metadata(t: &mut Text, doc: Doc<'_>) {
    t.map_section("Labels", &doc.labels());
    t.map_section("Annotations", &doc.annotations());
}

/// `cpu=500m, memory=128Mi`
pub fn inline_map(map: &BTreeMap<&str, String>) -> String {
    map.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(", ")
}

/// Container specs, joined with their runtime status by container name.
pub fn containers(t: &mut Text, specs: &[Doc<'_>], statuses: &[Doc<'_>]) {
    if specs.is_empty() {
        return;
    }
    t.heading("Containers");
    for (i, c) in specs.iter().enumerate() {
        let name = c.str_at(&["name"]);
        t.line(2, format_args!("{}. {}", i + 1, name));
        t.field_nonempty(5, "Image", c.str_at(&["image"]));
        let ports: Vec<String> = c
            .list_at(&["ports"])
            .iter()
            .map(|p| format!("{}/{}", p.display_at(&["containerPort"]), p.str_at(&["protocol"])).trim_end_matches('/').to_string())
            .collect();
        if !ports.is_empty() {
            t.field(5, "Ports", ports.join(", "));
        }
        let limits = c.string_map_at(&["resources", "limits"]);
        if !limits.is_empty() {
            t.field(5, "Limits", inline_map(&limits));
        }
        let requests = c.string_map_at(&["resources", "requests"]);
        if !requests.is_empty() {
            t.field(5, "Requests", inline_map(&requests));
        }
        if let Some(st) = statuses.iter().find(|s| s.str_at(&["name"]) == name) {
            t.field(5, "Ready", st.bool_at(&["ready"]).unwrap_or(false));
            t.field(5, "Restarts", st.i64_at(&["restartCount"]).unwrap_or(0));
        }
    }
}

/// `Type: Status (Reason)` lines with the message underneath.
pub fn conditions(t: &mut Text, conds: &[Doc<'_>]) {
    if conds.is_empty() {
        return;
    }
    t.heading("Conditions");
    for c in conds {
        let reason = c.str_at(&["reason"]);
        if reason.is_empty() {
            t.field(2, c.str_at(&["type"]), c.str_at(&["status"]));
        } else {
            t.line(2, format_args!("{}: {} ({})", c.str_at(&["type"]), c.str_at(&["status"]), reason));
        }
        t.field_nonempty(4, "Message", c.str_at(&["message"]));
    }
}

/// Leading `Found N noun(s):` line.
pub fn count_line(t: &mut Text, n: usize, noun: &str) {
    t.line(0, format_args!("Found {} {}(s):", n, noun));
}

/// One bullet per item followed by its entry lines, a blank line between items.
pub fn entries<'a, F>(t: &mut Text, items: &[Doc<'a>], entry: &mut F)
where
    F: FnMut(&mut Text, Doc<'a>),
{
    for d in items {
        t.line(2, format_args!("• {}", d.name()));
        entry(t, *d);
        t.blank();
    }
}

/// Split documents into namespace groups (sorted) and the cluster-scoped remainder,
/// preserving collection order inside each group.
pub fn group_by_namespace<'a>(docs: &[Doc<'a>]) -> (BTreeMap<&'a str, Vec<Doc<'a>>>, Vec<Doc<'a>>) {
    let mut groups: BTreeMap<&'a str, Vec<Doc<'a>>> = BTreeMap::new();
    let mut cluster = Vec::new();
    for d in docs {
        match d.namespace() {
            "" => cluster.push(*d),
            ns => groups.entry(ns).or_default().push(*d),
        }
    }
    (groups, cluster)
}

/// Standard list rendering for namespaced kinds: `Namespace: <ns> (<n> <unit>)` groups,
/// then a trailing `Cluster-scoped (<n> items)` bucket for documents without a namespace.
pub fn namespaced_list<'a, F>(docs: &[Doc<'a>], noun: &str, unit: &str, mut entry: F) -> String
where
    F: FnMut(&mut Text, Doc<'a>),
{
    let mut t = Text::new();
    count_line(&mut t, docs.len(), noun);
    let (groups, cluster) = group_by_namespace(docs);
    for (ns, items) in &groups {
        t.blank();
        t.line(0, format_args!("Namespace: {} ({} {})", ns, items.len(), unit));
        entries(&mut t, items, &mut entry);
    }
    if !cluster.is_empty() {
        t.blank();
        t.line(0, format_args!("Cluster-scoped ({} items)", cluster.len()));
        entries(&mut t, &cluster, &mut entry);
    }
    t.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_lines_do_not_stack_and_tail_is_trimmed() {
        let mut t = Text::new();
        t.blank();
        t.line(0, "a");
        t.blank();
        t.blank();
        t.heading("B");
        t.blank();
        assert_eq!(t.finish(), "a\n\nB:");
    }

    #[test]
    fn empty_map_section_is_omitted() {
        let mut t = Text::new();
        t.line(0, "x");
        t.map_section("Labels", &BTreeMap::new());
        assert_eq!(t.finish(), "x");
    }

    #[test]
    fn grouping_sorts_namespaces_and_keeps_item_order() {
        let v = vec![
            json!({"metadata": {"name": "b1", "namespace": "b"}}),
            json!({"metadata": {"name": "n1"}}),
            json!({"metadata": {"name": "a2", "namespace": "a"}}),
            json!({"metadata": {"name": "a1", "namespace": "a"}}),
        ];
        let docs: Vec<_> = v.iter().map(Doc::new).collect();
        let (groups, cluster) = group_by_namespace(&docs);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b"]);
        let a: Vec<_> = groups["a"].iter().map(|d| d.name()).collect();
        assert_eq!(a, vec!["a2", "a1"]);
        assert_eq!(cluster.len(), 1);
        let out = namespaced_list(&docs, "thing", "things", |_, _| {});
        assert!(out.starts_with("Found 4 thing(s):"));
        assert!(out.ends_with("Cluster-scoped (1 items)\n  • n1"));
    }
}
