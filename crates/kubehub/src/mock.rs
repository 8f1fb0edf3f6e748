//! In-memory [`ResourceAccess`] for tests and offline use.

use std::collections::HashMap;
use std::time::Duration;

use harvest_core::{Doc, ResourceType};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{AccessError, AccessResult, Op, ResourceAccess, Target};

/// Failure to inject for a given operation and resource.
#[derive(Debug, Clone)]
pub enum Failure {
    NotFound,
    Conflict,
    Remote(String),
}

/// Simple in-memory store keyed by resource type, seeded up front.
#[derive(Default)]
pub struct MockAccess {
    docs: Mutex<Vec<(ResourceType, Value)>>,
    failures: HashMap<(Op, &'static str), Failure>,
    scopes: HashMap<&'static str, bool>,
    latency: Option<Duration>,
}

impl MockAccess {
    pub fn new() -> Self { Self::default() }

    pub fn with_doc(mut self, ty: ResourceType, doc: Value) -> Self {
        self.docs.get_mut().push((ty, doc));
        self
    }

    pub fn with_docs(mut self, ty: ResourceType, docs: impl IntoIterator<Item = Value>) -> Self {
        self.docs.get_mut().extend(docs.into_iter().map(|d| (ty, d)));
        self
    }

    /// Make every `op` against `ty` fail.
    pub fn with_failure(mut self, op: Op, ty: ResourceType, failure: Failure) -> Self {
        self.failures.insert((op, ty.plural), failure);
        self
    }

    /// Override the scope reported by discovery for `ty`.
    pub fn with_scope(mut self, ty: ResourceType, namespaced: bool) -> Self {
        self.scopes.insert(ty.plural, namespaced);
        self
    }

    /// Delay every call, so callers can cancel while it is in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn snapshot(&self, ty: &ResourceType) -> Vec<Value> {
        self.docs.lock().await.iter().filter(|(t, _)| t == ty).map(|(_, d)| d.clone()).collect()
    }

    async fn enter(&self, op: Op, ty: &ResourceType, target: &Target) -> AccessResult<()> {
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        match self.failures.get(&(op, ty.plural)) {
            None => Ok(()),
            Some(Failure::NotFound) => Err(not_found(op, target.clone())),
            Some(Failure::Conflict) => {
                Err(AccessError::Conflict { op, target: target.clone(), message: "the object has been modified".into() })
            }
            Some(Failure::Remote(m)) => Err(AccessError::Remote { op, target: target.clone(), message: m.clone() }),
        }
    }
}

fn not_found(op: Op, target: Target) -> AccessError {
    let message = format!("{} \"{}\" not found", target.resource, target.name.as_deref().unwrap_or(""));
    AccessError::NotFound { op, target, message }
}

fn matches(doc: &Value, namespace: Option<&str>, name: &str) -> bool {
    let d = Doc::new(doc);
    d.name() == name && namespace.map_or(true, |ns| d.namespace() == ns)
}

#[async_trait::async_trait]
impl ResourceAccess for MockAccess {
    async fn list(&self, ty: &ResourceType, namespace: Option<&str>) -> AccessResult<Vec<Value>> {
        let target = Target::new(ty.plural, namespace, None);
        self.enter(Op::List, ty, &target).await?;
        let docs = self.docs.lock().await;
        Ok(docs
            .iter()
            .filter(|(t, d)| t == ty && namespace.map_or(true, |ns| Doc::new(d).namespace() == ns))
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn get(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<Value> {
        let target = Target::new(ty.plural, namespace, Some(name));
        self.enter(Op::Get, ty, &target).await?;
        let docs = self.docs.lock().await;
        docs.iter()
            .find(|(t, d)| t == ty && matches(d, namespace, name))
            .map(|(_, d)| d.clone())
            .ok_or_else(|| not_found(Op::Get, target))
    }

    async fn create(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value> {
        let name = Doc::new(&doc).name().to_string();
        let target = Target::new(ty.plural, namespace, Some(&name));
        self.enter(Op::Create, ty, &target).await?;
        let mut docs = self.docs.lock().await;
        if docs.iter().any(|(t, d)| t == ty && matches(d, namespace, &name)) {
            let message = format!("{} \"{}\" already exists", ty.plural, name);
            return Err(AccessError::Conflict { op: Op::Create, target, message });
        }
        docs.push((*ty, doc.clone()));
        Ok(doc)
    }

    async fn update(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value> {
        let name = Doc::new(&doc).name().to_string();
        let target = Target::new(ty.plural, namespace, Some(&name));
        self.enter(Op::Update, ty, &target).await?;
        let mut docs = self.docs.lock().await;
        match docs.iter_mut().find(|(t, d)| t == ty && matches(d, namespace, &name)) {
            Some((_, slot)) => {
                *slot = doc.clone();
                Ok(doc)
            }
            None => Err(not_found(Op::Update, target)),
        }
    }

    async fn delete(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<()> {
        let target = Target::new(ty.plural, namespace, Some(name));
        self.enter(Op::Delete, ty, &target).await?;
        let mut docs = self.docs.lock().await;
        match docs.iter().position(|(t, d)| t == ty && matches(d, namespace, name)) {
            Some(i) => {
                docs.remove(i);
                Ok(())
            }
            None => Err(not_found(Op::Delete, target)),
        }
    }

    async fn is_namespaced(&self, ty: &ResourceType) -> AccessResult<bool> {
        let target = Target::new(ty.plural, None, None);
        self.enter(Op::Discover, ty, &target).await?;
        Ok(self.scopes.get(ty.plural).copied().unwrap_or(ty.namespaced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{NODE, POD};
    use serde_json::json;

    fn pod(ns: &str, name: &str) -> Value {
        json!({"kind": "Pod", "metadata": {"name": name, "namespace": ns}})
    }

    #[tokio::test]
    async fn list_filters_by_type_and_namespace() {
        let m = MockAccess::new()
            .with_docs(POD, [pod("a", "p1"), pod("b", "p2")])
            .with_doc(NODE, json!({"kind": "Node", "metadata": {"name": "n1"}}));
        assert_eq!(m.list(&POD, None).await.unwrap().len(), 2);
        assert_eq!(m.list(&POD, Some("b")).await.unwrap().len(), 1);
        assert_eq!(m.list(&NODE, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let m = MockAccess::new().with_doc(POD, pod("default", "web"));
        m.delete(&POD, Some("default"), "web").await.unwrap();
        let err = m.get(&POD, Some("default"), "web").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.op(), Some(Op::Get));
        let err = m.delete(&POD, Some("default"), "web").await.unwrap_err();
        assert!(err.to_string().contains("\"web\" not found"));
    }

    #[tokio::test]
    async fn create_conflicts_on_existing_name() {
        let m = MockAccess::new().with_doc(POD, pod("default", "web"));
        let err = m.create(&POD, Some("default"), pod("default", "web")).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
        m.update(&POD, Some("default"), json!({"kind": "Pod", "metadata": {"name": "web", "namespace": "default", "labels": {"v": "2"}}}))
            .await
            .unwrap();
        let got = m.get(&POD, Some("default"), "web").await.unwrap();
        assert_eq!(got["metadata"]["labels"]["v"], "2");
    }

    #[tokio::test]
    async fn injected_failures_and_scope() {
        let m = MockAccess::new()
            .with_failure(Op::List, POD, Failure::Remote("connection refused".into()))
            .with_scope(POD, false);
        let err = m.list(&POD, None).await.unwrap_err();
        assert_eq!(err.kind(), "remote");
        assert!(!m.is_namespaced(&POD).await.unwrap());
        assert!(!m.is_namespaced(&NODE).await.unwrap());
    }
}
