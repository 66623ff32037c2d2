// crates/tankflux/src/commands/run.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use tankflux_core::{EnergyBalancePipeline, ParquetPublisher, PipelineConfig, PipelineError, Publisher};
use tankflux_store::{DataStore, JsonFileStore};
use tracing::{info, warn};

use super::resolve_store_path;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Store holding the raw channels (overrides source.store).
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Store receiving the result table; defaults to output.store, then the source store.
    #[arg(long)]
    pub output_store: Option<PathBuf>,
    /// Destination stem for parquet + provenance files (overrides output.publish).
    #[arg(long)]
    pub publish: Option<PathBuf>,
}

pub fn handle_run_command(args: RunArgs, config: &PipelineConfig) -> Result<()> {
    let source_path = resolve_store_path(args.store, config.source.store.as_ref(), "source")?;
    let output_path = args
        .output_store
        .or_else(|| config.output.store.clone())
        .unwrap_or_else(|| source_path.clone());

    let source = JsonFileStore::open(&source_path);
    if !source.exists() {
        anyhow::bail!("source store {} does not exist", source_path.display());
    }

    let pipeline = EnergyBalancePipeline::new(config.clone())?;
    let output = match pipeline.run(&source) {
        Ok(output) => output,
        Err(err @ PipelineError::RequiredChannelMissing { .. }) => {
            report_available_groups(&source, config);
            return Err(err).context("pipeline run failed");
        }
        Err(err) => return Err(err).context("pipeline run failed"),
    };

    let mut target = JsonFileStore::open(&output_path);
    pipeline
        .persist(&output, &mut target)
        .with_context(|| format!("failed to persist to {}", output_path.display()))?;

    // read back what was written before publishing it
    let group = &config.output.group;
    let (table, metadata) = target
        .read_table(group)?
        .with_context(|| format!("group {group} missing after persist"))?;
    info!(
        rows = table.height(),
        columns = table.width(),
        metadata_keys = metadata.len(),
        "result table read back"
    );

    println!(
        "Wrote {} rows x {} columns to {}:{}",
        table.height(),
        table.width(),
        output_path.display(),
        group
    );

    if let Some(destination) = args.publish.or_else(|| config.output.publish.clone()) {
        let publisher = ParquetPublisher::new(pipeline.descriptor());
        let artifacts = publisher.publish(
            &table,
            &config.report,
            std::slice::from_ref(&source_path),
            &destination,
        )?;
        println!(
            "Published {} (run {})",
            artifacts.table_path.display(),
            artifacts.run_id
        );
    }

    Ok(())
}

fn report_available_groups(store: &JsonFileStore, config: &PipelineConfig) {
    let brewing = config.source.brewing_group();
    match store.list_group(brewing) {
        Ok(Some(children)) => {
            println!("Available in {brewing}: {}", children.join(", "));
            if let Ok(Some(datasets)) = store.list_group(&config.source.tank_group()) {
                println!(
                    "Available in {}: {}",
                    config.source.tank_group(),
                    datasets.join(", ")
                );
            }
        }
        Ok(None) => {
            let roots = store.list_group("").ok().flatten().unwrap_or_default();
            println!("Group {brewing} not found; top-level groups: {}", roots.join(", "));
        }
        Err(err) => warn!(error = %err, "could not list store contents"),
    }
}
