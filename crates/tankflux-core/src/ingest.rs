use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tankflux_store::{AttributeValue, DataStore};
use tracing::info;

use crate::channels::ChannelKind;
use crate::config::{ChannelNames, SourceConfig};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub channels: Vec<(ChannelKind, usize)>,
}

/// Reads one column per channel from a headed CSV file and stores them under
/// `<brewing>/<tank>/<channel name>`.
pub fn import_readings_csv<S>(
    store: &mut S,
    path: impl AsRef<Path>,
    source: &SourceConfig,
    names: &ChannelNames,
) -> Result<ImportSummary>
where
    S: DataStore + ?Sized,
{
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let columns = read_channel_columns(file, names)?;

    let mut summary = Vec::with_capacity(columns.len());
    for (kind, values) in columns {
        let dataset = source.channel_path(names.name(kind));
        store.write_array(&dataset, &values)?;
        info!(
            stage = "import",
            channel = %kind,
            samples = values.len(),
            dataset = %dataset,
            "channel imported"
        );
        summary.push((kind, values.len()));
    }

    Ok(ImportSummary { channels: summary })
}

/// Parses the three channel columns out of CSV text.
///
/// Empty cells and `nan` (any case) become NaN. Empty cells at the end of a column are
/// dropped instead, so channels recorded with different lengths keep their own length.
pub fn read_channel_columns<R: Read>(
    reader: R,
    names: &ChannelNames,
) -> Result<Vec<(ChannelKind, Vec<f64>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut positions = Vec::with_capacity(ChannelKind::ALL.len());
    for kind in ChannelKind::ALL {
        let name = names.name(kind);
        let position = headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| {
                PipelineError::Import(format!("CSV has no '{name}' column for channel {kind}"))
            })?;
        positions.push((kind, position));
    }

    let mut columns: Vec<(ChannelKind, Vec<Option<f64>>)> = positions
        .iter()
        .map(|(kind, _)| (*kind, Vec::new()))
        .collect();

    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        for ((kind, position), (_, column)) in positions.iter().zip(columns.iter_mut()) {
            let cell = record.get(*position).unwrap_or("");
            let value = parse_cell(cell).ok_or_else(|| {
                PipelineError::Import(format!(
                    "row {}: cannot parse '{cell}' in column for {kind}",
                    row_index + 2
                ))
            })?;
            column.push(value);
        }
    }

    Ok(columns
        .into_iter()
        .map(|(kind, mut cells)| {
            while matches!(cells.last(), Some(None)) {
                cells.pop();
            }
            let values = cells
                .into_iter()
                .map(|cell| cell.unwrap_or(f64::NAN))
                .collect();
            (kind, values)
        })
        .collect())
}

/// `Some(None)` for an empty cell, `Some(Some(x))` for a number or `nan`, `None` if unparsable.
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    if cell.is_empty() {
        return Some(None);
    }
    if cell.eq_ignore_ascii_case("nan") {
        return Some(Some(f64::NAN));
    }
    cell.parse::<f64>().ok().map(Some)
}

/// Scalar attributes to attach to the brewing and tank groups.
///
/// ```toml
/// [brewing]
/// T_env = 18.5
///
/// [tank]
/// mass_tank = 350.0
/// heat_transfer_coeff_tank = 5.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeManifest {
    pub brewing: BTreeMap<String, f64>,
    pub tank: BTreeMap<String, f64>,
}

impl AttributeManifest {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let manifest: AttributeManifest = toml::from_str(raw)?;
        for (key, value) in manifest.brewing.iter().chain(manifest.tank.iter()) {
            if !value.is_finite() {
                return Err(PipelineError::Import(format!(
                    "attribute '{key}' must be finite, got {value}"
                )));
            }
        }
        Ok(manifest)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Writes every attribute and returns how many were written.
    pub fn apply<S>(&self, store: &mut S, source: &SourceConfig) -> Result<usize>
    where
        S: DataStore + ?Sized,
    {
        let tank_group = source.tank_group();
        let targets = [
            (source.brewing_group(), &self.brewing),
            (tank_group.as_str(), &self.tank),
        ];

        let mut written = 0;
        for (group, attributes) in targets {
            for (key, value) in attributes {
                store.write_attribute(group, key, AttributeValue::Float(*value))?;
                written += 1;
            }
        }

        info!(stage = "import", attributes = written, "attributes written");
        Ok(written)
    }
}
