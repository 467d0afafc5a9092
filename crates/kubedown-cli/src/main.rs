//! kubedown CLI - run Helm charts with docker compose or podman compose

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod display;
mod error;
mod exit_codes;
mod settings;

use error::Result;
use settings::Settings;

#[derive(Parser)]
#[command(name = "kubedown")]
#[command(author = "kubedown contributors")]
#[command(version)]
#[command(about = "Render Kubernetes charts into docker compose services", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (default: ~/.config/kubedown/config.yaml)
    #[arg(long, global = true, env = "KUBEDOWN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Root directory for generated compose files
    #[arg(long, env = "MANIFEST_DIR")]
    manifest_dir: Option<PathBuf>,

    /// Run every container on the host network
    #[arg(long, env = "KUBEDOWN_HOST_NETWORK")]
    host_network: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart and write one compose service per container
    #[command(disable_version_flag = true)]
    Sync {
        /// Module name, used as the output directory
        module: String,

        /// Chart reference (oci://host/repo/chart, repo/chart or a local path)
        chart: String,

        /// Chart version
        #[arg(long)]
        version: Option<String>,

        /// Values files, later files win (repeatable)
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key1=val1,key2=val2), applied in order
        #[arg(long = "set")]
        set: Vec<String>,

        /// Skip TLS certificate checks when pulling the chart
        #[arg(long, env = "KUBEDOWN_INSECURE")]
        insecure_skip_tls_verify: bool,

        /// Container engine whose registry logins are reused (docker, podman)
        #[arg(short, long)]
        engine: Option<String>,

        /// helm binary
        #[arg(long, env = "KUBEDOWN_HELM", default_value = "helm")]
        helm: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Translate already rendered manifests (file or - for stdin)
    Convert {
        /// Manifest file, or - to read stdin
        input: PathBuf,

        /// Module name (default: input file name)
        #[arg(short, long)]
        module: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the resolved containers without writing anything
    Inspect {
        /// Manifest file, or - to read stdin
        input: PathBuf,

        /// Resolve as if running on the host network
        #[arg(long, env = "KUBEDOWN_HOST_NETWORK")]
        host_network: bool,

        /// Output units as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check which registries the container engine is logged into
    Login {
        /// Container engine (docker, podman)
        #[arg(short, long)]
        engine: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            module,
            chart,
            version,
            values,
            set,
            insecure_skip_tls_verify,
            engine,
            helm,
            output,
        } => commands::sync::run(commands::sync::SyncOptions {
            module,
            chart,
            version,
            values_files: values,
            set_values: set,
            manifest_dir: settings.manifest_dir(output.manifest_dir)?,
            host_network: settings.host_network(output.host_network),
            insecure_skip_tls_verify: settings.insecure_skip_tls_verify(insecure_skip_tls_verify),
            engine: settings.engine(engine.as_deref())?,
            helm,
        }),

        Commands::Convert {
            input,
            module,
            output,
        } => {
            let module = module
                .or_else(|| commands::convert::default_module(&input))
                .ok_or_else(|| {
                    error::CliError::usage_with_help(
                        "A module name is required when reading stdin",
                        "Pass --module <name>",
                    )
                })?;
            commands::convert::run(
                &input,
                &module,
                &settings.manifest_dir(output.manifest_dir)?,
                settings.host_network(output.host_network),
            )
        }

        Commands::Inspect {
            input,
            host_network,
            json,
        } => commands::inspect::run(&input, settings.host_network(host_network), json),

        Commands::Login { engine } => commands::login::run(settings.engine(engine.as_deref())?),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
