// crates/tankflux/src/main.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tankflux_core::PipelineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::import::{handle_import_command, ImportArgs};
use commands::run::{handle_run_command, RunArgs};
use commands::show::{handle_show_command, ShowArgs};

const CONFIG_ENV: &str = "TANKFLUX_CONFIG";

/// Energy-balance analysis of brewing tank recordings
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration (TOML). Falls back to $TANKFLUX_CONFIG, then built-in defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Import channel readings from CSV (and tank attributes from TOML) into a store.
    Import(ImportArgs),
    /// Run the pipeline and persist the result table.
    Run(RunArgs),
    /// Summarize a stored result table, optionally exporting it as CSV.
    Show(ShowArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Import(args) => handle_import_command(args, &config)?,
        Commands::Run(args) => handle_run_command(args, &config)?,
        Commands::Show(args) => handle_show_command(args, &config)?,
    }

    info!("tankflux command finished");
    Ok(())
}

fn load_config(explicit: Option<PathBuf>) -> Result<PipelineConfig> {
    let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            info!("no configuration given, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}
