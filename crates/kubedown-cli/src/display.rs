//! Display formatting for CLI output

use console::style;
use kubedown_core::{AppUnit, EmitReport, NetworkMode, PostStartHook, WarningKind, Warnings};

/// One-line summary after the individual warnings were logged
pub fn print_warnings(warnings: &Warnings) {
    if warnings.is_empty() {
        return;
    }
    eprintln!(
        "{} {} warning(s): {}",
        style("⚠").yellow().bold(),
        warnings.len(),
        warning_summary(warnings)
    );
}

/// Short summary line, e.g. `2 missing-reference, 1 decode`
pub fn warning_summary(warnings: &Warnings) -> String {
    const KINDS: [WarningKind; 7] = [
        WarningKind::Parse,
        WarningKind::InvalidResource,
        WarningKind::Duplicate,
        WarningKind::MissingReference,
        WarningKind::Decode,
        WarningKind::FieldRef,
        WarningKind::Unsupported,
    ];

    KINDS
        .iter()
        .filter_map(|kind| match warnings.count(*kind) {
            0 => None,
            n => Some(format!("{} {}", n, kind.label())),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human readable view of one resolved unit
pub fn print_unit(unit: &AppUnit) {
    println!(
        "{} {} {}",
        style(&unit.name).cyan().bold(),
        style(format!("({} {})", unit.kind, unit.pod)).dim(),
        style(network_label(&unit.network_mode)).magenta()
    );
    println!("  {}: {}", style("image").dim(), unit.image);

    if !unit.command.is_empty() {
        println!("  {}: {}", style("command").dim(), unit.command.join(" "));
    }
    if !unit.ports.is_empty() {
        println!("  {}: {}", style("ports").dim(), unit.ports.join(", "));
    }
    if let Some(hook) = &unit.post_start {
        let text = match hook {
            PostStartHook::Exec { command } => format!("exec {}", command.join(" ")),
            PostStartHook::HttpGet { .. } => {
                format!("httpGet {}", hook.http_target().unwrap_or_default())
            }
        };
        println!("  {}: {}", style("postStart").dim(), text);
    }
    if !unit.environment.is_empty() {
        println!("  {}:", style("environment").dim());
        for (key, value) in &unit.environment {
            println!("    {}={}", key, value);
        }
    }
    if !unit.mounts.is_empty() {
        println!("  {}:", style("mounts").dim());
        for (path, content) in &unit.mounts {
            println!("    {} {}", path, style(format!("({} bytes)", content.len())).dim());
        }
    }
    println!();
}

fn network_label(mode: &NetworkMode) -> String {
    match mode {
        NetworkMode::None => "[bridge]".to_string(),
        NetworkMode::Host => "[host]".to_string(),
        NetworkMode::AttachTo(unit) => format!("[attached to {}]", unit),
    }
}

/// Units that were written; failures are already logged by the emitter
pub fn print_emit_report(report: &EmitReport) {
    for unit in &report.emitted {
        println!(
            "{} {} → {} {}",
            style("✓").green().bold(),
            style(&unit.name).bold(),
            unit.dir.display(),
            style(format!("({} mount file(s))", unit.files)).dim()
        );
    }
}
