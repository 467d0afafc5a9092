//! CLI commands

pub mod convert;
pub mod inspect;
pub mod login;
pub mod sync;

use console::style;
use kubedown_core::{AppUnit, Emitter, TranslateOptions, Translation, Warnings, translate};
use std::path::Path;

use crate::display;
use crate::error::Result;

/// Translate manifest text and print whatever was skipped on the way
pub(crate) fn translate_text(text: &str, host_network: bool) -> Result<Translation> {
    let translation = translate(text, TranslateOptions { host_network })?;
    display::print_warnings(&translation.warnings);
    Ok(translation)
}

/// Write `units` below `manifest_dir` and fail if any unit could not be written
pub(crate) fn emit_units(module: &str, units: &[AppUnit], manifest_dir: &Path) -> Result<()> {
    if units.is_empty() {
        println!(
            "{} No Deployments or StatefulSets found, nothing to write",
            style("!").yellow().bold()
        );
        return Ok(());
    }

    let mut warnings = Warnings::new();
    let report = Emitter::new(manifest_dir).emit(module, units, &mut warnings);
    display::print_warnings(&warnings);
    display::print_emit_report(&report);
    report.check()?;

    println!();
    println!(
        "{} {} unit(s) of module {} written to {}",
        style("✓").green().bold(),
        report.emitted.len(),
        style(module).cyan(),
        manifest_dir.display()
    );
    Ok(())
}
