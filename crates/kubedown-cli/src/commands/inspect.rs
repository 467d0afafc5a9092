//! Inspect command - show resolved units without writing anything

use console::style;
use kubedown_chart::{FileSource, ManifestSource};
use std::path::Path;

use crate::display;
use crate::error::{CliError, Result};

pub fn run(input: &Path, host_network: bool, json: bool) -> Result<()> {
    let text = FileSource::new(input).render()?;
    let translation = super::translate_text(&text, host_network)?;
    let units: Vec<_> = translation.units().collect();

    if json {
        let out = serde_json::to_string_pretty(&units).map_err(|e| CliError::Other {
            message: format!("Failed to serialize units: {}", e),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if units.is_empty() {
        println!("{}", style("No units").dim());
        return Ok(());
    }
    for unit in units {
        display::print_unit(unit);
    }
    Ok(())
}
