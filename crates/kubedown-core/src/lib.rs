//! Kubedown Core - Kubernetes manifests to compose services
//!
//! This crate turns rendered Kubernetes manifests into plain container
//! definitions:
//! - `Manifest`: classified resource records, in source order
//! - `ReferenceIndex`: ConfigMaps, Secrets and Services by name
//! - `PodResolver`: one `AppUnit` per container with every reference resolved
//! - `topology`: host networking and sidecar namespace sharing
//! - `Emitter`: `docker-compose.yaml` plus mount files per unit

pub mod app;
pub mod emitter;
pub mod error;
pub mod index;
pub mod resolver;
pub mod resource;
pub mod topology;
pub mod translate;
pub mod value;

pub use app::{AppUnit, NetworkMode, PodUnits, PostStartHook, WorkloadKind};
pub use emitter::{ComposeFile, ComposeService, EmitReport, EmittedUnit, Emitter, compose_for};
pub use error::{CoreError, Result, TranslateWarning, WarningKind, Warnings};
pub use index::{IndexOptions, ReferenceIndex, ServiceInfo, ServicePort};
pub use resolver::{PodResolver, ResolveError, resolve_workloads};
pub use resource::{Manifest, Resource, ResourceKind};
pub use translate::{TranslateOptions, Translation, translate};
pub use value::{Map, MapExt, Value};
