// crates/tankflux/src/commands/import.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use tankflux_core::ingest::{import_readings_csv, AttributeManifest};
use tankflux_core::PipelineConfig;
use tankflux_store::JsonFileStore;

use super::resolve_store_path;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file with one column per channel.
    #[arg(long)]
    pub csv: PathBuf,
    /// TOML manifest with [brewing] and [tank] attribute tables.
    #[arg(long)]
    pub attributes: Option<PathBuf>,
    /// Store to write into (overrides source.store).
    #[arg(long)]
    pub store: Option<PathBuf>,
}

pub fn handle_import_command(args: ImportArgs, config: &PipelineConfig) -> Result<()> {
    let store_path = resolve_store_path(args.store, config.source.store.as_ref(), "source")?;
    let mut store = JsonFileStore::open(&store_path);

    let summary = import_readings_csv(&mut store, &args.csv, &config.source, &config.channels)
        .with_context(|| format!("failed to import {}", args.csv.display()))?;
    for (kind, samples) in &summary.channels {
        println!("  {kind}: {samples} samples");
    }

    if let Some(path) = args.attributes {
        let manifest = AttributeManifest::load(&path)
            .with_context(|| format!("failed to read attribute manifest {}", path.display()))?;
        let written = manifest.apply(&mut store, &config.source)?;
        println!("  attributes: {written}");
    }

    println!(
        "Imported into {} under {}",
        store_path.display(),
        config.source.tank_group()
    );
    Ok(())
}
