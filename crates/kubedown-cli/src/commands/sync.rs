//! Sync command - render a chart and write its compose services

use console::style;
use kubedown_chart::{AuthFile, ContainerEngine, HelmTemplate, ManifestSource, RegistryCredentials};
use std::path::PathBuf;

use crate::error::Result;

pub struct SyncOptions {
    pub module: String,
    pub chart: String,
    pub version: Option<String>,
    pub values_files: Vec<PathBuf>,
    pub set_values: Vec<String>,
    pub manifest_dir: PathBuf,
    pub host_network: bool,
    pub insecure_skip_tls_verify: bool,
    pub engine: ContainerEngine,
    pub helm: PathBuf,
}

pub fn run(opts: SyncOptions) -> Result<()> {
    let credentials = registry_credentials(&opts.chart, opts.engine);

    let source = HelmTemplate::new(opts.chart.as_str())?
        .with_helm(&opts.helm)
        .with_version(opts.version)
        .with_values_files(opts.values_files)
        .with_set_values(opts.set_values)
        .insecure_skip_tls_verify(opts.insecure_skip_tls_verify)
        .with_credentials(credentials);

    eprintln!(
        "{} {}",
        style("Rendering").cyan().bold(),
        source.describe()
    );
    let text = source.render()?;

    let translation = super::translate_text(&text, opts.host_network)?;
    super::emit_units(&opts.module, &translation.into_units(), &opts.manifest_dir)
}

/// Credentials for remote charts, taken from the engine's login state.
///
/// Missing or unusable credentials are not an error here; public charts
/// render without them and helm reports the failure otherwise.
fn registry_credentials(chart: &str, engine: ContainerEngine) -> Option<RegistryCredentials> {
    if !chart.contains("://") {
        return None;
    }

    let auth_file = match AuthFile::load(engine) {
        Ok(Some((_, file))) => file,
        Ok(None) => {
            tracing::debug!(%engine, "no auth file, rendering without credentials");
            return None;
        }
        Err(e) => {
            tracing::warn!("ignoring {} credentials: {}", engine, e);
            return None;
        }
    };

    match auth_file.credentials_for(chart)? {
        Ok(creds) => {
            tracing::debug!(registry = %creds.registry, "using registry credentials");
            Some(creds)
        }
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_charts_need_no_credentials() {
        assert!(registry_credentials("./charts/web", ContainerEngine::Docker).is_none());
        assert!(registry_credentials("bitnami/redis", ContainerEngine::Podman).is_none());
    }
}
