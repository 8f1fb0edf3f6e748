//! Harvest tools: the named operations an agent can call.
//!
//! Every call resolves a friendly type, validates arguments, performs one access-layer
//! call and renders the result. Failures come back as text, never as a panic or a
//! protocol-level fault.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use harvest_core::{Doc, ResourceType, TypeRegistry, CRD};
use harvest_kubehub::{cancellable, AccessError, Op, ResourceAccess, Target};
use harvest_render::FormatterRegistry;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod catalog;

pub use catalog::{catalog, ParamSpec, ToolSpec, Verb, TOOLS};

/// Caller-facing failures. The display text is what the agent sees.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// `action` reads like "get pod web in namespace default".
    #[error("Failed to {action}: {source}")]
    Access { action: String, source: AccessError },
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArgument(_) => "invalid_argument",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Access { source, .. } => source.kind(),
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Rendered outcome of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

pub const DEFAULT_CRD_GROUPS: &[&str] = &["harvesterhci.io", "kubevirt.io", "cdi.kubevirt.io"];

/// Runtime knobs for the tool layer.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// API groups `list_crds` keeps; empty keeps everything.
    pub crd_groups: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self { Self { crd_groups: DEFAULT_CRD_GROUPS.iter().map(|g| g.to_string()).collect() } }
}

impl ToolSettings {
    /// Read `HARVEST_CRD_GROUPS` (comma-separated); unset keeps the defaults.
    pub fn from_env() -> Self {
        std::env::var("HARVEST_CRD_GROUPS").ok().map(|s| Self::with_groups(&s)).unwrap_or_default()
    }

    pub fn with_groups(list: &str) -> Self {
        Self { crd_groups: list.split(',').map(str::trim).filter(|g| !g.is_empty()).map(str::to_string).collect() }
    }
}

/// Dispatcher over the tool catalog.
pub struct Toolbox {
    access: Arc<dyn ResourceAccess>,
    types: TypeRegistry,
    formatters: FormatterRegistry,
    settings: ToolSettings,
    specs: Vec<ToolSpec>,
}

impl Toolbox {
    pub fn new(access: Arc<dyn ResourceAccess>, types: TypeRegistry, formatters: FormatterRegistry, settings: ToolSettings) -> Self {
        let specs = catalog(&types);
        Self { access, types, formatters, settings, specs }
    }

    /// Builtin types and formatters over `access`.
    pub fn with_access(access: Arc<dyn ResourceAccess>, settings: ToolSettings) -> Self {
        Self::new(access, TypeRegistry::builtin(), FormatterRegistry::builtin(), settings)
    }

    pub fn specs(&self) -> &[ToolSpec] { &self.specs }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> { self.specs.iter().find(|s| s.name == name) }

    pub fn types(&self) -> &TypeRegistry { &self.types }

    /// Run `name` with `args`, turning every failure into error text.
    pub async fn call(&self, name: &str, args: &Map<String, Value>, cancel: &CancellationToken) -> ToolOutput {
        let t0 = Instant::now();
        let ns = args.get("namespace").and_then(Value::as_str).unwrap_or("(all)");
        info!(tool = %name, resource = %self.resource_of(name), ns = %ns, "tools: call start");
        counter!("tool_calls_total", 1, "tool" => name.to_string());
        let res = self.run(name, args, cancel).await;
        let took_ms = t0.elapsed().as_millis();
        histogram!("tool_call_ms", took_ms as f64, "tool" => name.to_string());
        match res {
            Ok(text) => {
                info!(tool = %name, bytes = text.len(), took_ms = %took_ms, "tools: call ok");
                ToolOutput { text, is_error: false }
            }
            Err(e) => {
                let target = match &e {
                    ToolError::Access { source, .. } => source.target().map(|t| t.to_string()),
                    _ => None,
                };
                warn!(tool = %name, kind = e.kind(), target = ?target, error = %e, took_ms = %took_ms, "tools: call failed");
                counter!("tool_errors_total", 1, "tool" => name.to_string(), "kind" => e.kind());
                ToolOutput { text: e.to_string(), is_error: true }
            }
        }
    }

    /// Canonical friendly name of the type a tool works on, for logs.
    fn resource_of(&self, tool: &str) -> &'static str {
        self.spec(tool)
            .and_then(|s| self.types.resolve(s.resource))
            .and_then(|ty| self.types.friendly_name(ty))
            .unwrap_or("-")
    }

    async fn run(&self, name: &str, args: &Map<String, Value>, cancel: &CancellationToken) -> ToolResult<String> {
        let spec = self.spec(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let ty = *self
            .types
            .resolve(spec.resource)
            .ok_or_else(|| ToolError::InvalidArgument(format!("Unknown resource type: {}", spec.resource)))?;
        let ns = if ty.namespaced { arg(args, "namespace")? } else { None };
        match spec.verb {
            Verb::List => self.list(&ty, ns, cancel).await,
            Verb::Get => {
                let (ns, name) = single_target(&ty, args, ns)?;
                let doc = cancellable(cancel, Op::Get, Target::new(ty.plural, ns, Some(name)), self.access.get(&ty, ns, name))
                    .await
                    .map_err(|e| access_failure("get", &ty, ns, Some(name), e))?;
                Ok(self.formatters.render_one(&doc))
            }
            Verb::Delete => {
                let (ns, name) = single_target(&ty, args, ns)?;
                cancellable(cancel, Op::Delete, Target::new(ty.plural, ns, Some(name)), self.access.delete(&ty, ns, name))
                    .await
                    .map_err(|e| access_failure("delete", &ty, ns, Some(name), e))?;
                Ok(match ns {
                    Some(ns) => format!("Successfully deleted {} {} in namespace {}", ty.noun, name, ns),
                    None => format!("Successfully deleted {} {}", ty.noun, name),
                })
            }
        }
    }

    async fn list(&self, ty: &ResourceType, ns: Option<&str>, cancel: &CancellationToken) -> ToolResult<String> {
        let mut docs = cancellable(cancel, Op::List, Target::new(ty.plural, ns, None), self.access.list(ty, ns))
            .await
            .map_err(|e| access_failure("list", ty, ns, None, e))?;
        if *ty == CRD && !self.settings.crd_groups.is_empty() {
            let groups = &self.settings.crd_groups;
            docs.retain(|d| {
                let g = Doc::new(d).str_at(&["spec", "group"]);
                groups.iter().any(|want| want == g)
            });
        }
        Ok(self.formatters.render_many(&docs, ty))
    }

    /// `isNamespaced` discovery query for a friendly type name.
    pub async fn scope(&self, friendly: &str, cancel: &CancellationToken) -> ToolResult<bool> {
        let ty = *self
            .types
            .resolve(friendly)
            .ok_or_else(|| ToolError::InvalidArgument(format!("Unknown resource type: {}", friendly)))?;
        cancellable(cancel, Op::Discover, Target::new(ty.plural, None, None), self.access.is_namespaced(&ty))
            .await
            .map_err(|e| access_failure("discover", &ty, None, None, e))
    }
}

/// Optional string argument; blank counts as absent.
fn arg<'a>(args: &'a Map<String, Value>, key: &str) -> ToolResult<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(_) => Err(ToolError::InvalidArgument(format!("Argument {} must be a string", key))),
    }
}

/// Namespace (for namespaced types) and name, both required.
fn single_target<'a>(
    ty: &ResourceType,
    args: &'a Map<String, Value>,
    ns: Option<&'a str>,
) -> ToolResult<(Option<&'a str>, &'a str)> {
    if ty.namespaced && ns.is_none() {
        return Err(ToolError::InvalidArgument("Namespace is required".into()));
    }
    let name = arg(args, "name")?.ok_or_else(|| ToolError::InvalidArgument(format!("{} name is required", capitalize(ty.noun))))?;
    Ok((ns, name))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn access_failure(verb: &str, ty: &ResourceType, ns: Option<&str>, name: Option<&str>, source: AccessError) -> ToolError {
    let mut action = match name {
        Some(name) => format!("{} {} {}", verb, ty.noun, name),
        None => format!("{} {}", verb, ty.noun_plural),
    };
    if let Some(ns) = ns {
        action.push_str(" in namespace ");
        action.push_str(ns);
    }
    ToolError::Access { action, source }
}
