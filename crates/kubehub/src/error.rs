use std::fmt;

use serde::Serialize;

/// Access-layer operation, carried by every error for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
    Discover,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::List => "list",
            Op::Get => "get",
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::Discover => "discover",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// What an operation was aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub resource: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl Target {
    pub fn new(resource: &str, namespace: Option<&str>, name: Option<&str>) -> Self {
        Self { resource: resource.to_string(), namespace: namespace.map(str::to_string), name: name.map(str::to_string) }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, " in namespace {}", ns)?;
        }
        Ok(())
    }
}

/// Failures surfaced by [`crate::ResourceAccess`]. The display text is the cause only;
/// callers add their own operation phrasing from [`AccessError::op`] and [`AccessError::target`].
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("not found: {message}")]
    NotFound { op: Op, target: Target, message: String },
    #[error("conflict: {message}")]
    Conflict { op: Op, target: Target, message: String },
    #[error("{message}")]
    Remote { op: Op, target: Target, message: String },
    #[error("cancelled")]
    Cancelled { op: Op, target: Target },
    /// Client-side failure: configuration, connection setup or document encoding.
    #[error("client: {0}")]
    Client(String),
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    pub fn op(&self) -> Option<Op> {
        match self {
            AccessError::NotFound { op, .. }
            | AccessError::Conflict { op, .. }
            | AccessError::Remote { op, .. }
            | AccessError::Cancelled { op, .. } => Some(*op),
            AccessError::Client(_) => None,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            AccessError::NotFound { target, .. }
            | AccessError::Conflict { target, .. }
            | AccessError::Remote { target, .. }
            | AccessError::Cancelled { target, .. } => Some(target),
            AccessError::Client(_) => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::NotFound { .. } => "not_found",
            AccessError::Conflict { .. } => "conflict",
            AccessError::Remote { .. } => "remote",
            AccessError::Cancelled { .. } => "cancelled",
            AccessError::Client(_) => "client",
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, AccessError::NotFound { .. }) }

    /// Classify a kube client error: HTTP 404 and 409 keep their meaning, the rest is remote.
    pub fn from_kube(op: Op, target: Target, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => AccessError::NotFound { op, target, message: ae.message },
            kube::Error::Api(ae) if ae.code == 409 => AccessError::Conflict { op, target, message: ae.message },
            kube::Error::Api(ae) => AccessError::Remote { op, target, message: format!("{} ({})", ae.message, ae.code) },
            other => AccessError::Remote { op, target, message: other.to_string() },
        }
    }
}
