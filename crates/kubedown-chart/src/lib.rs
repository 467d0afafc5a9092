//! Kubedown Chart - rendering charts into manifests
//!
//! The translation engine only sees manifest text. This crate produces it:
//! - `ManifestSource`: pre-rendered files/stdin, or `helm template`
//! - `Values`: values file plus ordered `--set` overrides
//! - `AuthFile`: registry logins reused from docker or podman

pub mod credentials;
pub mod error;
pub mod source;
pub mod values;

pub use credentials::{AuthEntry, AuthFile, ContainerEngine, RegistryCredentials, registry_host};
pub use error::{ChartError, Result};
pub use source::{FileSource, HelmTemplate, ManifestSource, chart_name};
pub use values::{Values, parse_set_values};
