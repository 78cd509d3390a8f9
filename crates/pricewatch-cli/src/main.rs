use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pricewatch_core::PipelineOptions;
use tracing_subscriber::EnvFilter;

mod config;
mod display;
mod report;
mod runner;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "pricewatch",
    version,
    about = "Watch supplier price lists and report what changed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Acquire and process every configured supplier.
    Run {
        /// JSON run configuration; built-in suppliers when omitted.
        #[arg(long, env = "PRICEWATCH_CONFIG")]
        config: Option<PathBuf>,

        /// Working directory, overriding the configuration.
        #[arg(long, env = "PRICEWATCH_WORKDIR")]
        workdir: Option<PathBuf>,

        /// Restrict the run to these supplier ids.
        #[arg(long, num_args = 1..)]
        only: Vec<String>,
    },

    /// Run one cycle for a supplier on a local file.
    Process {
        #[arg(long)]
        supplier: String,

        #[arg(long)]
        file: PathBuf,

        #[arg(long, env = "PRICEWATCH_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, env = "PRICEWATCH_WORKDIR")]
        workdir: Option<PathBuf>,
    },

    /// Print the effective supplier configuration as JSON.
    Suppliers {
        #[arg(long, env = "PRICEWATCH_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the content hash used to detect new files.
    Fingerprint { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("pricewatch v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            workdir,
            only,
        } => {
            let mut app = AppConfig::load(config.as_deref())?;
            if let Some(dir) = workdir {
                app.workdir = dir;
            }
            let suppliers = app.resolve(&only)?;
            let runs = runner::run_all(&app, suppliers).await?;
            display::print_cycle_summary(&runs)?;
            Ok(exit_code(display::any_failed(&runs)))
        }
        Command::Process {
            supplier,
            file,
            config,
            workdir,
        } => {
            let mut app = AppConfig::load(config.as_deref())?;
            if let Some(dir) = workdir {
                app.workdir = dir;
            }
            let supplier = app.supplier(&supplier)?;
            if !file.is_file() {
                anyhow::bail!("not a file: {}", file.display());
            }
            let pipeline = runner::build_pipeline(
                &app.workdir,
                PipelineOptions {
                    delete_unchanged_source: false,
                },
            )?;
            let run = runner::run_one(pipeline, supplier, file).await;
            let runs = [run];
            runner::flag_changes(&app.workdir, &runs);
            display::print_cycle_summary(&runs)?;
            Ok(exit_code(display::any_failed(&runs)))
        }
        Command::Suppliers { config } => {
            let app = AppConfig::load(config.as_deref())?;
            let resolved = app.resolve(&[])?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Fingerprint { path } => {
            let hash = pricewatch_core::fingerprint_file(&path)
                .with_context(|| format!("hashing {}", path.display()))?;
            println!("{hash}  {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
