//! Login command - report which registries the container engine can pull from

use console::style;
use kubedown_chart::{AuthFile, ContainerEngine};

use crate::error::{CliError, Result};

pub fn run(engine: ContainerEngine) -> Result<()> {
    let Some((path, auth_file)) = AuthFile::load(engine)? else {
        return Err(CliError::render_with_help(
            format!("No {} auth file found", engine),
            format!("Run `{} login <registry>` first", engine),
        ));
    };

    println!(
        "{} {}",
        style("Reading credentials from").dim(),
        path.display()
    );

    let entries = auth_file.all();
    let mut usable = 0;
    for (registry, result) in &entries {
        match result {
            Ok(creds) => {
                usable += 1;
                println!(
                    "  {} {} {}",
                    style("✓").green().bold(),
                    registry,
                    style(format!("as {}", creds.username)).dim()
                );
            }
            Err(e) => {
                println!("  {} {} {}", style("✗").red().bold(), registry, style(e).dim());
            }
        }
    }

    if usable == 0 {
        return Err(CliError::render_with_help(
            format!("No usable credentials in {}", path.display()),
            format!(
                "Credential helpers are not supported; \
                 run `{} login` so the auth file holds the credentials",
                engine
            ),
        ));
    }

    println!();
    println!(
        "{} {} of {} registr{} usable",
        style("✓").green().bold(),
        usable,
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}
