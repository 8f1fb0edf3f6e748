//! Harvest kubehub: generic resource access over dynamic objects.
//!
//! One access path serves every resource type: the type's `(group, version, plural)`
//! becomes a kube `ApiResource` and all calls go through `Api<DynamicObject>`.

#![forbid(unsafe_code)]

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use harvest_core::ResourceType;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta},
    discovery::{Discovery, Scope},
    Client, Config,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod error;
mod mock;

pub use error::{AccessError, AccessResult, Op, Target};
pub use mock::{Failure, MockAccess};

/// Generic resource access, parameterized by resource type.
///
/// `namespace` of `None` means all namespaces for `list` and cluster scope for the
/// single-object calls. No call retries.
#[async_trait::async_trait]
pub trait ResourceAccess: Send + Sync {
    async fn list(&self, ty: &ResourceType, namespace: Option<&str>) -> AccessResult<Vec<Value>>;

    async fn get(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<Value>;

    /// Pass-through write; the platform validates.
    async fn create(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value>;

    /// Replace the object named by `doc.metadata.name`.
    async fn update(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value>;

    async fn delete(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<()>;

    /// Discovery query: is `ty` namespace-scoped on the live platform.
    async fn is_namespaced(&self, ty: &ResourceType) -> AccessResult<bool>;
}

/// Run `fut` unless `token` fires first, in which case the in-flight call is dropped.
pub async fn cancellable<T, F>(token: &CancellationToken, op: Op, target: Target, fut: F) -> AccessResult<T>
where
    F: Future<Output = AccessResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AccessError::Cancelled { op, target }),
        res = fut => res,
    }
}

/// Client connection settings.
#[derive(Debug, Clone, Default)]
pub struct KubeSettings {
    /// Explicit kubeconfig path; otherwise in-cluster config, then `$KUBECONFIG` / `~/.kube/config`.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one.
    pub context: Option<String>,
}

/// [`ResourceAccess`] backed by a live kube client.
#[derive(Clone)]
pub struct KubeAccess {
    client: Client,
}

impl KubeAccess {
    pub fn new(client: Client) -> Self { Self { client } }

    pub async fn connect(settings: &KubeSettings) -> AccessResult<Self> {
        let client = match (&settings.kubeconfig, &settings.context) {
            (None, None) => Client::try_default().await.map_err(|e| AccessError::Client(e.to_string()))?,
            (path, context) => {
                let opts = KubeConfigOptions { context: context.clone(), ..Default::default() };
                let config = match path {
                    Some(p) => {
                        let kc = Kubeconfig::read_from(p)
                            .map_err(|e| AccessError::Client(format!("reading {}: {}", p.display(), e)))?;
                        Config::from_custom_kubeconfig(kc, &opts).await
                    }
                    None => Config::from_kubeconfig(&opts).await,
                }
                .map_err(|e| AccessError::Client(e.to_string()))?;
                Client::try_from(config).map_err(|e| AccessError::Client(e.to_string()))?
            }
        };
        info!(kubeconfig = ?settings.kubeconfig, context = ?settings.context, "kubehub: client ready");
        Ok(Self { client })
    }

    fn api(&self, ty: &ResourceType, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = api_resource(ty);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

fn api_resource(ty: &ResourceType) -> ApiResource {
    let gvk = GroupVersionKind::gvk(ty.group, ty.version, ty.kind);
    ApiResource::from_gvk_with_plural(&gvk, ty.plural)
}

fn into_document(mut obj: DynamicObject, ty: &ResourceType) -> AccessResult<Value> {
    // List items come back without their type header.
    if obj.types.is_none() {
        obj.types = Some(TypeMeta { api_version: ty.api_version(), kind: ty.kind.to_string() });
    }
    #[allow(unused_mut)]
    let mut raw = serde_json::to_value(&obj).map_err(|e| AccessError::Client(format!("serializing {}: {}", ty.plural, e)))?;
    #[cfg(feature = "strip-managed-fields")]
    strip_managed_fields(&mut raw);
    Ok(raw)
}

#[cfg(feature = "strip-managed-fields")]
fn strip_managed_fields(v: &mut Value) {
    if let Some(meta) = v.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.remove("managedFields");
    }
}

fn from_document(doc: Value, ty: &ResourceType) -> AccessResult<DynamicObject> {
    serde_json::from_value(doc).map_err(|e| AccessError::Client(format!("decoding {} document: {}", ty.plural, e)))
}

#[async_trait::async_trait]
impl ResourceAccess for KubeAccess {
    async fn list(&self, ty: &ResourceType, namespace: Option<&str>) -> AccessResult<Vec<Value>> {
        let t0 = Instant::now();
        let target = Target::new(ty.plural, namespace, None);
        let list = self
            .api(ty, namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| AccessError::from_kube(Op::List, target, e))?;
        let docs = list.items.into_iter().map(|o| into_document(o, ty)).collect::<AccessResult<Vec<_>>>()?;
        debug!(gvr = %ty, ns = %namespace.unwrap_or("(all)"), items = docs.len(), took_ms = %t0.elapsed().as_millis(), "kubehub: list ok");
        Ok(docs)
    }

    async fn get(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<Value> {
        let t0 = Instant::now();
        let target = Target::new(ty.plural, namespace, Some(name));
        let obj = self.api(ty, namespace).get(name).await.map_err(|e| AccessError::from_kube(Op::Get, target, e))?;
        debug!(gvr = %ty, name = %name, took_ms = %t0.elapsed().as_millis(), "kubehub: get ok");
        into_document(obj, ty)
    }

    async fn create(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value> {
        let obj = from_document(doc, ty)?;
        let namespace = namespace.or(obj.metadata.namespace.as_deref()).map(str::to_string);
        let target = Target::new(ty.plural, namespace.as_deref(), obj.metadata.name.as_deref());
        let created = self
            .api(ty, namespace.as_deref())
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| AccessError::from_kube(Op::Create, target, e))?;
        into_document(created, ty)
    }

    async fn update(&self, ty: &ResourceType, namespace: Option<&str>, doc: Value) -> AccessResult<Value> {
        let obj = from_document(doc, ty)?;
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| AccessError::Client(format!("{} document has no metadata.name", ty.plural)))?;
        let namespace = namespace.or(obj.metadata.namespace.as_deref()).map(str::to_string);
        let target = Target::new(ty.plural, namespace.as_deref(), Some(&name));
        let replaced = self
            .api(ty, namespace.as_deref())
            .replace(&name, &PostParams::default(), &obj)
            .await
            .map_err(|e| AccessError::from_kube(Op::Update, target, e))?;
        into_document(replaced, ty)
    }

    async fn delete(&self, ty: &ResourceType, namespace: Option<&str>, name: &str) -> AccessResult<()> {
        let target = Target::new(ty.plural, namespace, Some(name));
        self.api(ty, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| AccessError::from_kube(Op::Delete, target, e))?;
        info!(gvr = %ty, ns = %namespace.unwrap_or("-"), name = %name, "kubehub: delete accepted");
        Ok(())
    }

    async fn is_namespaced(&self, ty: &ResourceType) -> AccessResult<bool> {
        let t0 = Instant::now();
        let target = Target::new(ty.plural, None, None);
        let discovery = Discovery::new(self.client.clone())
            .filter(&[ty.group])
            .run()
            .await
            .map_err(|e| AccessError::from_kube(Op::Discover, target.clone(), e))?;
        for group in discovery.groups() {
            for (ar, caps) in group.versioned_resources(ty.version) {
                if ar.plural == ty.plural {
                    let namespaced = matches!(caps.scope, Scope::Namespaced);
                    debug!(gvr = %ty, namespaced, took_ms = %t0.elapsed().as_millis(), "kubehub: discover ok");
                    return Ok(namespaced);
                }
            }
        }
        Err(AccessError::NotFound {
            op: Op::Discover,
            target,
            message: format!("resource type {} is not served", ty.gvr_key()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{NODE, POD, VIRTUAL_MACHINE};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn api_resource_from_type() {
        let ar = api_resource(&VIRTUAL_MACHINE);
        assert_eq!(ar.api_version, "kubevirt.io/v1");
        assert_eq!(ar.plural, "virtualmachines");
        assert_eq!(api_resource(&POD).api_version, "v1");
    }

    #[test]
    fn list_items_get_type_header_and_lose_managed_fields() {
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::ManagedFieldsEntry;
        let mut obj = DynamicObject::new("n1", &api_resource(&NODE));
        obj.types = None;
        obj.metadata.managed_fields = Some(vec![ManagedFieldsEntry { manager: Some("kubelet".into()), ..Default::default() }]);
        obj.data = json!({"status": {"phase": "Ready"}});
        let doc = into_document(obj, &NODE).unwrap();
        assert_eq!(doc["kind"], "Node");
        assert_eq!(doc["apiVersion"], "v1");
        assert_eq!(doc["status"]["phase"], "Ready");
        #[cfg(feature = "strip-managed-fields")]
        assert!(doc["metadata"].get("managedFields").is_none());
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_slow_call() {
        let token = CancellationToken::new();
        token.cancel();
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, AccessError>(())
        };
        let err = cancellable(&token, Op::List, Target::new("pods", None, None), slow).await.unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }

    #[tokio::test]
    async fn uncancelled_call_passes_through() {
        let token = CancellationToken::new();
        let v = cancellable(&token, Op::Get, Target::new("pods", None, None), async { Ok::<_, AccessError>(7) }).await;
        assert_eq!(v.unwrap(), 7);
    }
}
