// crates/tankflux/src/commands/show.rs

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use polars::prelude::*;
use tankflux_core::{PipelineConfig, PlotFormat};
use tankflux_store::{DataStore, JsonFileStore};

use super::resolve_store_path;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Store to read from; defaults to output.store, then source.store.
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Group holding the table (overrides output.group).
    #[arg(long)]
    pub group: Option<String>,
    /// Export the table to this CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn handle_show_command(args: ShowArgs, config: &PipelineConfig) -> Result<()> {
    let configured = config.output.store.as_ref().or(config.source.store.as_ref());
    let store_path = resolve_store_path(args.store, configured, "output")?;
    let group = args.group.unwrap_or_else(|| config.output.group.clone());

    let store = JsonFileStore::open(&store_path);
    let (mut df, metadata) = store
        .read_table(&group)?
        .with_context(|| format!("no table at {}:{group}", store_path.display()))?;

    if let Some(format) = PlotFormat::from_metadata(&metadata) {
        println!("{} ({} vs {})", format.legend_title, format.y_label, format.x_label);
    }
    println!("{}", column_summary(&df)?);

    let mut attributes = Table::new();
    attributes.load_preset(UTF8_FULL).set_header(vec!["attribute", "value"]);
    for (key, value) in &metadata {
        attributes.add_row(vec![key.clone(), value.to_string()]);
    }
    println!("{attributes}");

    if let Some(path) = args.csv {
        let mut file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .context("failed to write CSV")?;
        println!("Exported {} rows to {}", df.height(), path.display());
    }

    Ok(())
}

fn column_summary(df: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["column", "rows", "min", "max", "mean"]);

    let format = |value: Option<f64>| value.map(|v| format!("{v:.3}")).unwrap_or_default();
    for column in df.get_columns() {
        let values = column.f64()?;
        table.add_row(vec![
            column.name().to_string(),
            values.len().to_string(),
            format(values.min()),
            format(values.max()),
            format(values.mean()),
        ]);
    }
    Ok(table)
}
