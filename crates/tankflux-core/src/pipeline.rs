use std::fmt;

use once_cell::sync::Lazy;
use polars::prelude::*;
use tankflux_store::{AttributeValue, DataStore, Metadata};
use tracing::{error, info, info_span, warn};

use crate::alignment::align_channels;
use crate::channels::{ChannelKind, RawChannels};
use crate::cleaning::{clean_channels, CleanedChannels};
use crate::config::PipelineConfig;
use crate::energy::{self, EnergyTrace};
use crate::error::{PipelineError, Result};
use crate::parameters::{self, ResolvedParameters};
use crate::smoothing::moving_average;

pub const TIME_COLUMN: &str = "time";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor {
    pub code: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

static DESCRIPTOR: Lazy<PipelineDescriptor> = Lazy::new(|| PipelineDescriptor {
    code: "energy_balance_v1",
    version: "0.1.0",
    description: "Align + clean + moving-average variants + internal energy trace",
});

pub fn pipeline_descriptor() -> &'static PipelineDescriptor {
    &DESCRIPTOR
}

/// Steps of one run, in execution order. Per-window steps repeat for every filter size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ReadRaw,
    ResolveParameters,
    Align,
    Clean,
    Smooth { window: usize },
    DeriveMass { window: usize },
    Truncate { window: usize },
    ComputeEnergyTrace { window: usize },
    Assemble,
    Persist,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::ReadRaw => f.write_str("read_raw"),
            PipelineStage::ResolveParameters => f.write_str("resolve_parameters"),
            PipelineStage::Align => f.write_str("align"),
            PipelineStage::Clean => f.write_str("clean"),
            PipelineStage::Smooth { window } => write!(f, "smooth[k={window}]"),
            PipelineStage::DeriveMass { window } => write!(f, "derive_mass[k={window}]"),
            PipelineStage::Truncate { window } => write!(f, "truncate[k={window}]"),
            PipelineStage::ComputeEnergyTrace { window } => {
                write!(f, "compute_energy_trace[k={window}]")
            }
            PipelineStage::Assemble => f.write_str("assemble"),
            PipelineStage::Persist => f.write_str("persist"),
        }
    }
}

/// Logs the stage a run failed in and passes the error through unchanged.
fn in_stage<T>(stage: PipelineStage, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        error!(stage = %stage, error = %err, "pipeline stage failed");
    }
    result
}

/// Smoothed signals and derived quantities for one moving-average window.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterVariant {
    pub window: usize,
    pub level: Vec<f64>,
    pub temperature: Vec<f64>,
    pub mass: Vec<f64>,
    pub energy: EnergyTrace,
}

impl FilterVariant {
    pub fn level_column(&self) -> String {
        format!("level_k_{}", self.window)
    }

    pub fn temperature_column(&self) -> String {
        format!("temperature_k_{}", self.window)
    }

    pub fn mass_column(&self) -> String {
        format!("mass_k_{}", self.window)
    }

    pub fn energy_column(&self) -> String {
        format!("inner_energy_k_{}", self.window)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: DataFrame,
    pub variants: Vec<FilterVariant>,
    pub parameters: ResolvedParameters,
    pub metadata: Metadata,
}

/// Energy-balance analysis of one tank, parameterized by [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct EnergyBalancePipeline {
    config: PipelineConfig,
}

impl EnergyBalancePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &'static PipelineDescriptor {
        pipeline_descriptor()
    }

    /// Reads the three raw channels of the configured tank.
    pub fn read_raw<S>(&self, store: &S) -> Result<RawChannels>
    where
        S: DataStore + ?Sized,
    {
        in_stage(PipelineStage::ReadRaw, self.read_raw_inner(store))
    }

    fn read_raw_inner<S>(&self, store: &S) -> Result<RawChannels>
    where
        S: DataStore + ?Sized,
    {
        let source = &self.config.source;
        let mut raw = RawChannels::default();
        for kind in ChannelKind::ALL {
            let path = source.channel_path(self.config.channels.name(kind));
            match store.read_array(&path)? {
                Some(values) => {
                    info!(
                        stage = %PipelineStage::ReadRaw,
                        channel = %kind,
                        samples = values.len(),
                        "channel read"
                    );
                    raw.insert(kind, values);
                }
                None => {
                    let available = store
                        .list_group(&source.tank_group())?
                        .unwrap_or_default();
                    warn!(
                        stage = %PipelineStage::ReadRaw,
                        channel = %kind,
                        path = %path,
                        available = ?available,
                        "channel dataset not found"
                    );
                    return Err(PipelineError::RequiredChannelMissing { channel: kind });
                }
            }
        }
        Ok(raw)
    }

    pub fn resolve_parameters<S>(&self, store: &S) -> Result<ResolvedParameters>
    where
        S: DataStore + ?Sized,
    {
        in_stage(
            PipelineStage::ResolveParameters,
            parameters::resolve_parameters(store, &self.config),
        )
    }

    /// The store-independent part of a run: align, clean, one variant per window, assemble.
    pub fn process(
        &self,
        raw: &RawChannels,
        parameters: &ResolvedParameters,
    ) -> Result<PipelineOutput> {
        let aligned = in_stage(PipelineStage::Align, align_channels(raw))?;
        let cleaned = in_stage(PipelineStage::Clean, clean_channels(&aligned))?;

        let mut variants = Vec::with_capacity(self.config.filter_sizes.len());
        for &window in &self.config.filter_sizes {
            let span = info_span!("filter_variant", window);
            let _guard = span.enter();
            variants.push(self.build_variant(&cleaned, parameters, window)?);
        }

        let table = in_stage(
            PipelineStage::Assemble,
            assemble_table(cleaned.temperature.time(), &variants),
        )?;
        let metadata = self.output_metadata(parameters, &table);

        info!(
            stage = %PipelineStage::Assemble,
            rows = table.height(),
            columns = table.width(),
            "result table assembled"
        );

        Ok(PipelineOutput {
            table,
            variants,
            parameters: parameters.clone(),
            metadata,
        })
    }

    fn build_variant(
        &self,
        cleaned: &CleanedChannels,
        parameters: &ResolvedParameters,
        window: usize,
    ) -> Result<FilterVariant> {
        let params = &parameters.values;
        let level = in_stage(
            PipelineStage::Smooth { window },
            cleaned
                .level_values()
                .and_then(|values| moving_average(values, window)),
        )?;
        let unfiltered_temperature = in_stage(
            PipelineStage::Smooth { window },
            cleaned.temperature_values(),
        )?;
        let temperature = in_stage(
            PipelineStage::Smooth { window },
            moving_average(unfiltered_temperature, window),
        )?;
        let mass = in_stage(
            PipelineStage::DeriveMass { window },
            energy::mass(&level, params.tank_footprint, params.liquid_density),
        )?;

        let time = cleaned.temperature.time();
        let common = mass.len().min(unfiltered_temperature.len()).min(time.len());
        if common < time.len() {
            info!(
                stage = %PipelineStage::Truncate { window },
                samples = common,
                dropped = time.len() - common,
                "truncated to common length"
            );
        }

        let energy = in_stage(
            PipelineStage::ComputeEnergyTrace { window },
            energy::internal_energy_trace(
                params,
                &time[..common],
                &mass[..common],
                &unfiltered_temperature[..common],
            ),
        )?;

        Ok(FilterVariant {
            window,
            level,
            temperature,
            mass,
            energy,
        })
    }

    fn output_metadata(&self, parameters: &ResolvedParameters, table: &DataFrame) -> Metadata {
        let descriptor = self.descriptor();
        let mut metadata = self.config.report.to_metadata();
        metadata.insert("pipeline_code".to_string(), descriptor.code.into());
        metadata.insert("pipeline_version".to_string(), descriptor.version.into());
        metadata.insert(
            "brewing".to_string(),
            self.config.source.brewing.as_str().into(),
        );
        metadata.insert("tank".to_string(), self.config.source.tank.as_str().into());
        metadata.insert(
            "filter_sizes".to_string(),
            AttributeValue::TextList(
                self.config
                    .filter_sizes
                    .iter()
                    .map(|size| size.to_string())
                    .collect(),
            ),
        );
        metadata.insert(
            "row_count".to_string(),
            AttributeValue::Integer(table.height() as i64),
        );
        metadata.extend(parameters.metadata());
        metadata
    }

    /// Reads, resolves and processes. Nothing is written.
    pub fn run<S>(&self, store: &S) -> Result<PipelineOutput>
    where
        S: DataStore + ?Sized,
    {
        let descriptor = self.descriptor();
        let span = info_span!(
            "pipeline",
            code = descriptor.code,
            brewing = %self.config.source.brewing,
            tank = %self.config.source.tank
        );
        let _guard = span.enter();

        let raw = self.read_raw(store)?;
        let parameters = self.resolve_parameters(store)?;
        self.process(&raw, &parameters)
    }

    /// Writes the result table and its metadata to the configured output group.
    pub fn persist<S>(&self, output: &PipelineOutput, store: &mut S) -> Result<()>
    where
        S: DataStore + ?Sized,
    {
        let group = &self.config.output.group;
        in_stage(
            PipelineStage::Persist,
            store
                .write_table(group, &output.table, &output.metadata)
                .map_err(PipelineError::from),
        )?;
        info!(
            stage = %PipelineStage::Persist,
            group = %group,
            rows = output.table.height(),
            "result table persisted"
        );
        Ok(())
    }
}

/// `time` plus four columns per variant, all cut to the shortest energy trace.
pub fn assemble_table(time: &[f64], variants: &[FilterVariant]) -> Result<DataFrame> {
    let height = variants
        .iter()
        .map(|variant| variant.energy.len())
        .min()
        .unwrap_or(0)
        .min(time.len());

    let mut columns: Vec<Column> = Vec::with_capacity(1 + 4 * variants.len());
    columns.push(Series::new(TIME_COLUMN.into(), time[..height].to_vec()).into());
    for variant in variants {
        for (name, values) in [
            (variant.level_column(), &variant.level),
            (variant.temperature_column(), &variant.temperature),
            (variant.mass_column(), &variant.mass),
            (variant.energy_column(), &variant.energy.values),
        ] {
            let keep = height.min(values.len());
            columns.push(Series::new(name.into(), values[..keep].to_vec()).into());
        }
    }

    Ok(DataFrame::new(columns)?)
}
