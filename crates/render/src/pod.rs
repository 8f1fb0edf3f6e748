use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

/// Observed phase, overridden by the observed reason when one is set.
pub fn pod_status<'a>(doc: Doc<'a>) -> &'a str {
    match doc.str_at(&["status", "reason"]) {
        "" => doc.str_at(&["status", "phase"]),
        reason => reason,
    }
}

pub struct PodFormatter;

impl Formatter for PodFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Pod", doc, pod_status(doc));
        t.field_nonempty(0, "Node", doc.str_at(&["spec", "nodeName"]));
        t.field_nonempty(0, "Pod IP", doc.str_at(&["status", "podIP"]));
        t.field_nonempty(0, "QoS Class", doc.str_at(&["status", "qosClass"]));
        text::containers(&mut t, &doc.list_at(&["spec", "containers"]), &doc.list_at(&["status", "containerStatuses"]));
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "pod", "pods", |t, d| {
            let statuses = d.list_at(&["status", "containerStatuses"]);
            let ready = statuses.iter().filter(|s| s.bool_at(&["ready"]) == Some(true)).count();
            let restarts: i64 = statuses.iter().filter_map(|s| s.i64_at(&["restartCount"])).sum();
            t.field_nonempty(4, "Status", pod_status(d));
            t.line(4, format_args!("Ready: {}/{} containers", ready, d.list_at(&["spec", "containers"]).len()));
            t.field_nonempty(4, "Node", d.str_at(&["spec", "nodeName"]));
            t.field_nonempty(4, "IP", d.str_at(&["status", "podIP"]));
            t.field(4, "Created", d.created());
            t.field(4, "Restarts", restarts);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reason_overrides_phase() {
        let v = json!({"status": {"phase": "Failed", "reason": "Evicted"}});
        assert_eq!(pod_status(Doc::new(&v)), "Evicted");
        let v = json!({"status": {"phase": "Running", "reason": ""}});
        assert_eq!(pod_status(Doc::new(&v)), "Running");
    }

    #[test]
    fn detail_joins_container_status_by_name() {
        let v = json!({
            "kind": "Pod",
            "metadata": {"name": "web-1", "namespace": "default", "creationTimestamp": "2024-05-01T10:00:00Z"},
            "spec": {"nodeName": "node-a", "containers": [
                {"name": "app", "image": "nginx:1.25", "resources": {"limits": {"memory": "128Mi", "cpu": "500m"}}}
            ]},
            "status": {"phase": "Running", "podIP": "10.0.0.7", "containerStatuses": [{"name": "app", "ready": true, "restartCount": 2}]}
        });
        let out = PodFormatter.render_one(Doc::new(&v));
        let expected = "Pod: web-1\nNamespace: default\nStatus: Running\nCreated: 2024-05-01T10:00:00Z\nNode: node-a\nPod IP: 10.0.0.7\n\nContainers:\n  1. app\n     Image: nginx:1.25\n     Limits: cpu=500m, memory=128Mi\n     Ready: true\n     Restarts: 2";
        assert_eq!(out, expected);
    }

    #[test]
    fn list_counts_ready_and_restarts() {
        let v = json!({
            "kind": "Pod",
            "metadata": {"name": "p", "namespace": "ns"},
            "spec": {"containers": [{"name": "a"}, {"name": "b"}]},
            "status": {"phase": "Running", "containerStatuses": [
                {"name": "a", "ready": true, "restartCount": 1},
                {"name": "b", "ready": false, "restartCount": 3}
            ]}
        });
        let out = PodFormatter.render_many(&[Doc::new(&v)]);
        assert!(out.contains("Namespace: ns (1 pods)"));
        assert!(out.contains("    Ready: 1/2 containers"));
        assert!(out.contains("    Restarts: 4"));
        assert!(out.contains("    Created: <unknown>"));
    }
}
