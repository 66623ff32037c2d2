use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tankflux_store::{AttributeValue, Metadata};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::PipelineDescriptor;

const LEGEND_TITLE: &str = "legend_title";
const X_LABEL: &str = "x_label";
const X_UNIT: &str = "x_unit";
const Y_LABEL: &str = "y_label";
const Y_UNIT: &str = "y_unit";

/// Axis and legend labels for rendering the energy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotFormat {
    pub legend_title: String,
    pub x_label: String,
    pub x_unit: String,
    pub y_label: String,
    pub y_unit: String,
}

impl Default for PlotFormat {
    fn default() -> Self {
        Self {
            legend_title: "Internal Energy Analysis".to_string(),
            x_label: "Time (s)".to_string(),
            x_unit: "s".to_string(),
            y_label: "Internal Energy (J)".to_string(),
            y_unit: "J".to_string(),
        }
    }
}

impl PlotFormat {
    pub fn to_metadata(&self) -> Metadata {
        [
            (LEGEND_TITLE, &self.legend_title),
            (X_LABEL, &self.x_label),
            (X_UNIT, &self.x_unit),
            (Y_LABEL, &self.y_label),
            (Y_UNIT, &self.y_unit),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), AttributeValue::from(value.as_str())))
        .collect()
    }

    /// `None` unless all five keys are present as text.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(AttributeValue::as_str)
                .map(str::to_string)
        };
        Some(Self {
            legend_title: text(LEGEND_TITLE)?,
            x_label: text(X_LABEL)?,
            x_unit: text(X_UNIT)?,
            y_label: text(Y_LABEL)?,
            y_unit: text(Y_UNIT)?,
        })
    }
}

/// Files produced by one publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedArtifacts {
    pub run_id: Uuid,
    pub table_path: PathBuf,
    pub provenance_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub path: String,
    pub blake3: String,
}

/// Contents of `<destination>.provenance.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceManifest {
    pub run_id: Uuid,
    pub generated_at: String,
    pub pipeline_code: String,
    pub pipeline_version: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub plot_format: PlotFormat,
    pub sources: Vec<SourceFingerprint>,
}

pub trait Publisher {
    fn publish(
        &self,
        table: &DataFrame,
        format: &PlotFormat,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<PublishedArtifacts>;
}

/// Writes the table as zstd-compressed parquet next to a JSON provenance manifest.
#[derive(Debug, Clone)]
pub struct ParquetPublisher {
    pipeline_code: String,
    pipeline_version: String,
}

impl ParquetPublisher {
    pub fn new(descriptor: &PipelineDescriptor) -> Self {
        Self {
            pipeline_code: descriptor.code.to_string(),
            pipeline_version: descriptor.version.to_string(),
        }
    }
}

impl Publisher for ParquetPublisher {
    fn publish(
        &self,
        table: &DataFrame,
        format: &PlotFormat,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<PublishedArtifacts> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let table_path = with_suffix(destination, ".parquet");
        let provenance_path = with_suffix(destination, ".provenance.json");

        let mut file = File::create(&table_path)?;
        let mut clone = table.clone();
        ParquetWriter::new(&mut file)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;

        let mut fingerprints = Vec::with_capacity(sources.len());
        for source in sources {
            fingerprints.push(fingerprint(source)?);
        }

        let run_id = Uuid::new_v4();
        let manifest = ProvenanceManifest {
            run_id,
            generated_at: Utc::now().to_rfc3339(),
            pipeline_code: self.pipeline_code.clone(),
            pipeline_version: self.pipeline_version.clone(),
            row_count: table.height(),
            columns: table
                .get_column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            plot_format: format.clone(),
            sources: fingerprints,
        };
        fs::write(&provenance_path, serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            stage = "publish",
            run_id = %run_id,
            rows = table.height(),
            table = %table_path.display(),
            "published result table"
        );

        Ok(PublishedArtifacts {
            run_id,
            table_path,
            provenance_path,
        })
    }
}

fn with_suffix(destination: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(destination.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

fn fingerprint(path: &Path) -> Result<SourceFingerprint> {
    let bytes = fs::read(path)?;
    Ok(SourceFingerprint {
        path: path.display().to_string(),
        blake3: blake3::hash(&bytes).to_hex().to_string(),
    })
}
