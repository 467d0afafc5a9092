//! Convert command - translate already rendered manifests

use kubedown_chart::{FileSource, ManifestSource};
use std::path::Path;

use crate::error::Result;

pub fn run(input: &Path, module: &str, manifest_dir: &Path, host_network: bool) -> Result<()> {
    let source = FileSource::new(input);
    tracing::debug!(source = %source.describe(), module, "converting manifests");

    let text = source.render()?;
    let translation = super::translate_text(&text, host_network)?;
    super::emit_units(module, &translation.into_units(), manifest_dir)
}

/// Module name when none is given: the input file stem
pub fn default_module(input: &Path) -> Option<String> {
    if input.as_os_str() == "-" {
        return None;
    }
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}
