//! Application units: one fully resolved container each

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Workload kinds that produce application units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => f.write_str("Deployment"),
            Self::StatefulSet => f.write_str("StatefulSet"),
        }
    }
}

/// How a unit is wired into the network
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NetworkMode {
    /// Runtime default bridge network with explicit port mappings
    #[default]
    None,
    /// Share the host network stack
    Host,
    /// Join another unit's network namespace, the way sidecars share a pod
    AttachTo(String),
}

impl NetworkMode {
    /// Value for compose's `network_mode` field, if any
    pub fn compose_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Host => Some("host".to_string()),
            Self::AttachTo(unit) => Some(format!("service:{}", unit)),
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Host => f.write_str("host"),
            Self::AttachTo(unit) => write!(f, "attach-to:{}", unit),
        }
    }
}

impl Serialize for NetworkMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Container `lifecycle.postStart` handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostStartHook {
    Exec { command: Vec<String> },
    HttpGet { path: String, port: String },
}

impl PostStartHook {
    /// `path:port` for HTTP hooks
    pub fn http_target(&self) -> Option<String> {
        match self {
            Self::HttpGet { path, port } => Some(format!("{}:{}", path, port)),
            Self::Exec { .. } => None,
        }
    }
}

/// One runtime-executable container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUnit {
    pub name: String,
    pub kind: WorkloadKind,
    /// Name of the Deployment/StatefulSet the container came from
    pub pod: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
    /// Absolute container path -> file content
    pub mounts: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_start: Option<PostStartHook>,
    pub network_mode: NetworkMode,
}

impl AppUnit {
    pub fn new(name: impl Into<String>, kind: WorkloadKind, pod: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            pod: pod.into(),
            image: String::new(),
            command: Vec::new(),
            environment: BTreeMap::new(),
            mounts: BTreeMap::new(),
            ports: Vec::new(),
            post_start: None,
            network_mode: NetworkMode::None,
        }
    }
}

/// All units produced from one pod template, main container first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodUnits {
    pub pod: String,
    pub units: Vec<AppUnit>,
}
