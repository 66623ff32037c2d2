use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::channels::ChannelKind;
use crate::error::{PipelineError, Result};
use crate::parameters::parameter_definition;
use crate::report::PlotFormat;

pub const DEFAULT_FILTER_SIZES: [usize; 3] = [3, 5, 7];
pub const DEFAULT_BREWING: &str = "brewing_0002";
pub const DEFAULT_TANK: &str = "B004";
pub const DEFAULT_OUTPUT_GROUP: &str = "processed_data";

/// Everything one pipeline run needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Moving-average window sizes, one result variant each, in output column order.
    pub filter_sizes: Vec<usize>,
    pub source: SourceConfig,
    pub channels: ChannelNames,
    pub liquid: LiquidConfig,
    /// Parameter code to value; wins over store attributes and defaults.
    pub parameters: BTreeMap<String, f64>,
    pub output: OutputConfig,
    pub report: PlotFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_sizes: DEFAULT_FILTER_SIZES.to_vec(),
            source: SourceConfig::default(),
            channels: ChannelNames::default(),
            liquid: LiquidConfig::default(),
            parameters: BTreeMap::new(),
            output: OutputConfig::default(),
            report: PlotFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub store: Option<PathBuf>,
    pub brewing: String,
    pub tank: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            store: None,
            brewing: DEFAULT_BREWING.to_string(),
            tank: DEFAULT_TANK.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn brewing_group(&self) -> &str {
        &self.brewing
    }

    pub fn tank_group(&self) -> String {
        format!("{}/{}", self.brewing, self.tank)
    }

    pub fn channel_path(&self, dataset: &str) -> String {
        format!("{}/{}/{}", self.brewing, self.tank, dataset)
    }
}

/// Dataset names of the raw channels inside the tank group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelNames {
    pub level: String,
    pub temperature: String,
    pub timestamp: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            level: ChannelKind::Level.as_str().to_string(),
            temperature: ChannelKind::Temperature.as_str().to_string(),
            timestamp: ChannelKind::Timestamp.as_str().to_string(),
        }
    }
}

impl ChannelNames {
    pub fn name(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::Level => &self.level,
            ChannelKind::Temperature => &self.temperature,
            ChannelKind::Timestamp => &self.timestamp,
        }
    }
}

/// Properties of the liquid and tank geometry. Unset values fall back to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiquidConfig {
    pub specific_heat_capacity: Option<f64>,
    pub footprint: Option<f64>,
    pub density: Option<f64>,
}

impl LiquidConfig {
    /// Looks up a liquid setting by the attribute name used in parameter definitions.
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "specific_heat_capacity" => self.specific_heat_capacity,
            "footprint" => self.footprint,
            "density" => self.density,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Defaults to the source store.
    pub store: Option<PathBuf>,
    pub group: String,
    /// Destination stem for the published parquet file and provenance manifest.
    pub publish: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store: None,
            group: DEFAULT_OUTPUT_GROUP.to_string(),
            publish: None,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document; absent sections take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            PipelineError::Config(format!("failed to read '{}': {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filter_sizes.is_empty() {
            return Err(PipelineError::Config(
                "filter_sizes must list at least one window".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for &size in &self.filter_sizes {
            if size == 0 {
                return Err(PipelineError::InvalidWindow(size));
            }
            if !seen.insert(size) {
                return Err(PipelineError::Config(format!(
                    "filter size {size} is listed more than once"
                )));
            }
        }

        require_identifier("source.brewing", &self.source.brewing)?;
        require_identifier("source.tank", &self.source.tank)?;
        require_identifier("output.group", &self.output.group)?;
        for kind in ChannelKind::ALL {
            require_identifier(&format!("channels.{kind}"), self.channels.name(kind))?;
        }

        for (key, value) in [
            ("specific_heat_capacity", self.liquid.specific_heat_capacity),
            ("footprint", self.liquid.footprint),
            ("density", self.liquid.density),
        ] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(PipelineError::Config(format!(
                        "liquid.{key} must be finite, got {value}"
                    )));
                }
            }
        }

        for (code, value) in &self.parameters {
            if parameter_definition(code).is_none() {
                return Err(PipelineError::Config(format!(
                    "unknown parameter override '{code}'"
                )));
            }
            if !value.is_finite() {
                return Err(PipelineError::Config(format!(
                    "parameter override '{code}' must be finite, got {value}"
                )));
            }
        }

        Ok(())
    }
}

fn require_identifier(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Config(format!("{field} must not be empty")));
    }
    if trimmed.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PipelineError::Config(format!(
            "{field} must not contain '.' or '..' segments"
        )));
    }
    Ok(())
}
