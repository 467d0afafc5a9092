//! Settings file and effective configuration
//!
//! Stored in `~/.config/kubedown/config.yaml`. Flags and environment variables
//! take precedence over the file, the file over built-in defaults.

use kubedown_chart::ContainerEngine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Root directory compose files are written to
    #[serde(default)]
    pub manifest_dir: Option<PathBuf>,

    #[serde(default)]
    pub host_network: Option<bool>,

    #[serde(default)]
    pub insecure_skip_tls_verify: Option<bool>,

    /// `docker` or `podman`
    #[serde(default)]
    pub engine: Option<String>,
}

impl Settings {
    /// Load from `path`, or from the default location. A missing file is not
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            CliError::usage_with_help(
                format!("Invalid settings file {}: {}", path.display(), e),
                "Known keys: manifestDir, hostNetwork, insecureSkipTlsVerify, engine",
            )
        })
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kubedown").join("config.yaml"))
    }

    /// Flag value, else settings file, else `<config_dir>/kubedown/manifests`
    pub fn manifest_dir(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.manifest_dir.clone())
            .or_else(|| dirs::config_dir().map(|dir| dir.join("kubedown").join("manifests")))
            .ok_or_else(|| {
                CliError::usage_with_help(
                    "Could not determine the manifest directory",
                    "Pass --manifest-dir or set MANIFEST_DIR",
                )
            })
    }

    /// Boolean flags can only switch a setting on
    pub fn host_network(&self, flag: bool) -> bool {
        flag || self.host_network.unwrap_or(false)
    }

    pub fn insecure_skip_tls_verify(&self, flag: bool) -> bool {
        flag || self.insecure_skip_tls_verify.unwrap_or(false)
    }

    pub fn engine(&self, flag: Option<&str>) -> Result<ContainerEngine> {
        match flag.or(self.engine.as_deref()) {
            Some(name) => Ok(name.parse()?),
            None => Ok(ContainerEngine::default()),
        }
    }
}
