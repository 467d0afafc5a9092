//! Where rendered manifests come from

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use url::Url;

use crate::credentials::RegistryCredentials;
use crate::error::{ChartError, Result};
use crate::values::Values;

/// Produces `---`-separated manifest text
pub trait ManifestSource {
    /// Human readable origin, used in logs and messages
    fn describe(&self) -> String;

    fn render(&self) -> Result<String>;
}

/// Pre-rendered manifests from a file, or stdin for `-`
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

impl ManifestSource for FileSource {
    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn render(&self) -> Result<String> {
        if self.is_stdin() {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        } else {
            Ok(std::fs::read_to_string(&self.path)?)
        }
    }
}

/// Renders a chart with `helm template`, client side only
#[derive(Debug, Clone)]
pub struct HelmTemplate {
    chart: String,
    release: String,
    helm: PathBuf,
    version: Option<String>,
    values_files: Vec<PathBuf>,
    set_values: Vec<String>,
    insecure_skip_tls_verify: bool,
    credentials: Option<RegistryCredentials>,
}

impl HelmTemplate {
    /// The release name is derived from the chart reference
    pub fn new(chart: impl Into<String>) -> Result<Self> {
        let chart = chart.into();
        let release = chart_name(&chart)?;
        Ok(Self {
            chart,
            release,
            helm: PathBuf::from("helm"),
            version: None,
            values_files: Vec::new(),
            set_values: Vec::new(),
            insecure_skip_tls_verify: false,
            credentials: None,
        })
    }

    pub fn with_helm(mut self, helm: impl Into<PathBuf>) -> Self {
        self.helm = helm.into();
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Values files, merged in order with later files winning
    pub fn with_values_files(mut self, paths: Vec<PathBuf>) -> Self {
        self.values_files = paths;
        self
    }

    /// Ordered `key=value` overrides applied on top of the values file
    pub fn with_set_values(mut self, set_values: Vec<String>) -> Self {
        self.set_values = set_values;
        self
    }

    pub fn insecure_skip_tls_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_tls_verify = insecure;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<RegistryCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn chart(&self) -> &str {
        &self.chart
    }

    /// Values files merged in order, then the `--set` overrides applied
    pub fn values(&self) -> Result<Values> {
        let mut values = Values::new();
        for path in &self.values_files {
            values.merge(&Values::from_file(path)?);
        }
        values.apply_set(&self.set_values)?;
        Ok(values)
    }

    /// Arguments passed to helm, given the merged values file.
    ///
    /// Hook resources are left out so that hook ConfigMaps and Secrets never
    /// shadow the release's own. `helm template` only takes registry
    /// credentials as `--username`/`--password`, so the password is visible
    /// in the process list while helm runs.
    pub fn args(&self, values_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "template".into(),
            self.release.clone().into(),
            self.chart.clone().into(),
            "--no-hooks".into(),
            "--values".into(),
            values_path.as_os_str().to_owned(),
        ];
        if let Some(version) = &self.version {
            args.push("--version".into());
            args.push(version.clone().into());
        }
        if self.insecure_skip_tls_verify {
            args.push("--insecure-skip-tls-verify".into());
        }
        if let Some(creds) = &self.credentials {
            args.push("--username".into());
            args.push(creds.username.clone().into());
            args.push("--password".into());
            args.push(creds.password.clone().into());
        }
        args
    }
}

impl ManifestSource for HelmTemplate {
    fn describe(&self) -> String {
        format!("helm template {} {}", self.release, self.chart)
    }

    fn render(&self) -> Result<String> {
        let values = self.values()?;

        let mut values_file = tempfile::Builder::new()
            .prefix("kubedown-values-")
            .suffix(".yaml")
            .tempfile()?;
        values_file.write_all(values.to_yaml()?.as_bytes())?;
        values_file.flush()?;

        tracing::debug!(
            helm = %self.helm.display(),
            release = %self.release,
            chart = %self.chart,
            "rendering chart"
        );

        let output = Command::new(&self.helm)
            .args(self.args(values_file.path()))
            .output()
            .map_err(|source| ChartError::Spawn {
                program: self.helm.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ChartError::RenderFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ChartError::NotUtf8)
    }
}

/// Chart name from a reference: `oci://host/repo/chart:tag` → `chart`,
/// `./charts/web` → `web`, `bitnami/redis@sha256:..` → `redis`.
pub fn chart_name(reference: &str) -> Result<String> {
    let path = match Url::parse(reference) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => reference.to_string(),
    };

    let last = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name = last.split([':', '@']).next().unwrap_or_default();

    if name.is_empty() {
        return Err(ChartError::InvalidChartRef {
            reference: reference.to_string(),
            reason: "no chart name".to_string(),
        });
    }
    Ok(name.to_string())
}
