//! Read-only accessors over schema-less resource documents.
//!
//! Every accessor tolerates missing or mistyped fields and returns an empty
//! value instead of failing; formatters decide how absence is shown.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Placeholder for an absent timestamp.
pub const UNKNOWN: &str = "<unknown>";

static NULL: Value = Value::Null;

/// Borrowed view over one resource document (or any nested object within one).
#[derive(Debug, Clone, Copy)]
pub struct Doc<'a> {
    raw: &'a Value,
}

impl<'a> Doc<'a> {
    pub fn new(raw: &'a Value) -> Self { Self { raw } }

    pub fn raw(&self) -> &'a Value { self.raw }

    pub fn kind(&self) -> &'a str { self.str_at(&["kind"]) }

    pub fn api_version(&self) -> &'a str { self.str_at(&["apiVersion"]) }

    pub fn name(&self) -> &'a str { self.str_at(&["metadata", "name"]) }

    pub fn namespace(&self) -> &'a str { self.str_at(&["metadata", "namespace"]) }

    /// Creation timestamp normalized to RFC3339 UTC, or [`UNKNOWN`].
    pub fn created(&self) -> String {
        match self.get(&["metadata", "creationTimestamp"]).and_then(Value::as_str) {
            Some(ts) if !ts.is_empty() => format_timestamp(ts),
            _ => UNKNOWN.to_string(),
        }
    }

    pub fn labels(&self) -> BTreeMap<&'a str, String> { self.string_map_at(&["metadata", "labels"]) }

    pub fn annotations(&self) -> BTreeMap<&'a str, String> { self.string_map_at(&["metadata", "annotations"]) }

    /// Walk `path` through nested objects.
    pub fn get(&self, path: &[&str]) -> Option<&'a Value> {
        let mut cur = self.raw;
        for seg in path {
            cur = cur.as_object()?.get(*seg)?;
        }
        Some(cur)
    }

    pub fn has(&self, path: &[&str]) -> bool { self.get(path).is_some() }

    /// Sub-document at `path`; an absent path yields a view over `null`.
    pub fn at(&self, path: &[&str]) -> Doc<'a> {
        Doc { raw: self.get(path).unwrap_or(&NULL) }
    }

    pub fn str_at(&self, path: &[&str]) -> &'a str {
        self.get(path).and_then(Value::as_str).unwrap_or("")
    }

    /// Integer field; absent or non-integral values read as `None`.
    pub fn i64_at(&self, path: &[&str]) -> Option<i64> {
        let v = self.get(path)?;
        v.as_i64().or_else(|| v.as_u64().and_then(|u| i64::try_from(u).ok()))
    }

    pub fn bool_at(&self, path: &[&str]) -> Option<bool> { self.get(path).and_then(Value::as_bool) }

    /// Array field as sub-documents; absent or non-array yields an empty list.
    pub fn list_at(&self, path: &[&str]) -> Vec<Doc<'a>> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Doc::new).collect())
            .unwrap_or_default()
    }

    /// Array of strings; non-string entries are rendered with [`display_value`].
    pub fn strings_at(&self, path: &[&str]) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(display_value).collect())
            .unwrap_or_default()
    }

    pub fn map_at(&self, path: &[&str]) -> Option<&'a Map<String, Value>> {
        self.get(path).and_then(Value::as_object)
    }

    /// Object field flattened to sorted `key -> display string` pairs.
    pub fn string_map_at(&self, path: &[&str]) -> BTreeMap<&'a str, String> {
        self.map_at(path)
            .map(|m| m.iter().map(|(k, v)| (k.as_str(), display_value(v))).collect())
            .unwrap_or_default()
    }

    /// Display string for whatever sits at `path`, empty when absent.
    pub fn display_at(&self, path: &[&str]) -> String {
        self.get(path).map(display_value).unwrap_or_default()
    }

    pub fn is_null(&self) -> bool { self.raw.is_null() }
}

/// Render a scalar or composite value as display text.
///
/// Strings render bare, `null` renders empty, numbers and booleans render in their
/// JSON form and arrays/objects as compact JSON.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Normalize an RFC3339 timestamp to UTC with second precision.
/// Unparseable input is returned verbatim.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => t.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_tolerate_missing_and_mistyped_fields() {
        let v = json!({
            "kind": "Pod",
            "metadata": {"name": "web-1", "labels": {"app": "web", "tier": 3}},
            "spec": {"replicas": "three", "containers": "not-a-list"}
        });
        let d = Doc::new(&v);
        assert_eq!(d.kind(), "Pod");
        assert_eq!(d.name(), "web-1");
        assert_eq!(d.namespace(), "");
        assert_eq!(d.created(), UNKNOWN);
        assert_eq!(d.i64_at(&["spec", "replicas"]), None);
        assert!(d.list_at(&["spec", "containers"]).is_empty());
        assert_eq!(d.str_at(&["status", "phase"]), "");
        assert!(d.at(&["status"]).is_null());
        let labels: Vec<_> = d.labels().into_iter().collect();
        assert_eq!(labels, vec![("app", "web".to_string()), ("tier", "3".to_string())]);
    }

    #[test]
    fn timestamps_normalize_to_utc_seconds() {
        assert_eq!(format_timestamp("2024-03-01T10:00:00Z"), "2024-03-01T10:00:00Z");
        assert_eq!(format_timestamp("2024-03-01T12:00:00.123+02:00"), "2024-03-01T10:00:00Z");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn display_value_shapes() {
        assert_eq!(display_value(&json!("x")), "x");
        assert_eq!(display_value(&json!(8080)), "8080");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }
}
