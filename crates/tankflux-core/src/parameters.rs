use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tankflux_store::{AttributeValue, DataStore, Metadata};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Where a parameter's value is looked up when no override is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterScope {
    /// Attribute on the `<brewing>/<tank>` group.
    Tank,
    /// Attribute on the `<brewing>` group.
    Brewing,
    /// `[liquid]` section of the pipeline configuration.
    Liquid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    Override,
    Store,
    Configuration,
    Default,
}

impl ParameterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterSource::Override => "override",
            ParameterSource::Store => "store",
            ParameterSource::Configuration => "configuration",
            ParameterSource::Default => "default",
        }
    }
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub code: &'static str,
    pub scope: ParameterScope,
    /// Attribute key in the store, or key in the liquid configuration.
    pub key: &'static str,
    /// `None` marks a required parameter.
    pub default_value: Option<f64>,
}

impl ParameterDefinition {
    pub fn is_required(&self) -> bool {
        self.default_value.is_none()
    }
}

pub const HEATER_POWER: &str = "heater_power";
pub const HEATER_EFFICIENCY: &str = "heater_efficiency";
pub const HEAT_TRANSFER_COEFFICIENT: &str = "heat_transfer_coefficient";
pub const SURFACE_AREA: &str = "surface_area";
pub const AMBIENT_TEMPERATURE: &str = "ambient_temperature";
pub const TANK_MASS: &str = "tank_mass";
pub const TANK_SPECIFIC_HEAT_CAPACITY: &str = "tank_specific_heat_capacity";
pub const LIQUID_SPECIFIC_HEAT_CAPACITY: &str = "liquid_specific_heat_capacity";
pub const TANK_FOOTPRINT: &str = "tank_footprint";
pub const LIQUID_DENSITY: &str = "liquid_density";

static DEFINITIONS: Lazy<Vec<ParameterDefinition>> = Lazy::new(|| {
    use ParameterScope::{Brewing, Liquid, Tank};

    vec![
        ParameterDefinition {
            code: HEATER_POWER,
            scope: Tank,
            key: "power_heater",
            default_value: Some(0.0),
        },
        ParameterDefinition {
            code: HEATER_EFFICIENCY,
            scope: Tank,
            key: "efficiency_heater",
            default_value: Some(1.0),
        },
        ParameterDefinition {
            code: HEAT_TRANSFER_COEFFICIENT,
            scope: Tank,
            key: "heat_transfer_coeff_tank",
            default_value: None,
        },
        ParameterDefinition {
            code: SURFACE_AREA,
            scope: Tank,
            key: "surface_area_tank",
            default_value: None,
        },
        ParameterDefinition {
            code: AMBIENT_TEMPERATURE,
            scope: Brewing,
            key: "T_env",
            default_value: None,
        },
        ParameterDefinition {
            code: TANK_MASS,
            scope: Tank,
            key: "mass_tank",
            default_value: None,
        },
        ParameterDefinition {
            code: TANK_SPECIFIC_HEAT_CAPACITY,
            scope: Tank,
            key: "specific_heat_capacity_tank",
            default_value: None,
        },
        ParameterDefinition {
            code: LIQUID_SPECIFIC_HEAT_CAPACITY,
            scope: Liquid,
            key: "specific_heat_capacity",
            default_value: Some(4184.0),
        },
        ParameterDefinition {
            code: TANK_FOOTPRINT,
            scope: Liquid,
            key: "footprint",
            default_value: Some(2.5),
        },
        ParameterDefinition {
            code: LIQUID_DENSITY,
            scope: Liquid,
            key: "density",
            default_value: Some(1000.0),
        },
    ]
});

pub fn canonical_parameter_definitions() -> &'static [ParameterDefinition] {
    DEFINITIONS.as_slice()
}

pub fn parameter_definition(code: &str) -> Option<&'static ParameterDefinition> {
    DEFINITIONS.iter().find(|definition| definition.code == code)
}

/// Physical constants of one tank and its contents, SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParameters {
    pub heater_power: f64,
    pub heater_efficiency: f64,
    pub heat_transfer_coefficient: f64,
    pub surface_area: f64,
    pub ambient_temperature: f64,
    pub tank_mass: f64,
    pub tank_specific_heat_capacity: f64,
    pub liquid_density: f64,
    pub tank_footprint: f64,
    pub liquid_specific_heat_capacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameter {
    pub code: &'static str,
    pub value: f64,
    pub source: ParameterSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    pub values: PhysicalParameters,
    pub provenance: Vec<ResolvedParameter>,
}

impl ResolvedParameters {
    pub fn source_of(&self, code: &str) -> Option<ParameterSource> {
        self.provenance
            .iter()
            .find(|resolved| resolved.code == code)
            .map(|resolved| resolved.source)
    }

    /// `parameter_<code>` and `parameter_source_<code>` entries for the result metadata.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        for resolved in &self.provenance {
            metadata.insert(
                format!("parameter_{}", resolved.code),
                AttributeValue::Float(resolved.value),
            );
            metadata.insert(
                format!("parameter_source_{}", resolved.code),
                AttributeValue::from(resolved.source.as_str()),
            );
        }
        metadata
    }
}

/// Resolves every canonical parameter.
///
/// Precedence: configured override, then the store attribute (tank and brewing scopes) or the
/// liquid configuration (liquid scope), then the built-in default. A required parameter with
/// no value anywhere fails the run.
pub fn resolve_parameters<S>(store: &S, config: &PipelineConfig) -> Result<ResolvedParameters>
where
    S: DataStore + ?Sized,
{
    let mut provenance = Vec::with_capacity(DEFINITIONS.len());
    for definition in DEFINITIONS.iter() {
        let (value, source) = resolve_single_parameter(store, config, definition)?;
        if !value.is_finite() {
            return Err(PipelineError::invalid_parameter(
                definition.code,
                format!("resolved to non-finite value {value} from {source}"),
            ));
        }
        debug!(
            stage = "resolve_parameters",
            parameter = definition.code,
            value,
            source = %source,
            "parameter resolved"
        );
        provenance.push(ResolvedParameter {
            code: definition.code,
            value,
            source,
        });
    }

    let lookup = |code: &str| {
        provenance
            .iter()
            .find(|resolved| resolved.code == code)
            .map(|resolved| resolved.value)
            .ok_or_else(|| PipelineError::invalid_parameter(code, "not resolved"))
    };

    let values = PhysicalParameters {
        heater_power: lookup(HEATER_POWER)?,
        heater_efficiency: lookup(HEATER_EFFICIENCY)?,
        heat_transfer_coefficient: lookup(HEAT_TRANSFER_COEFFICIENT)?,
        surface_area: lookup(SURFACE_AREA)?,
        ambient_temperature: lookup(AMBIENT_TEMPERATURE)?,
        tank_mass: lookup(TANK_MASS)?,
        tank_specific_heat_capacity: lookup(TANK_SPECIFIC_HEAT_CAPACITY)?,
        liquid_density: lookup(LIQUID_DENSITY)?,
        tank_footprint: lookup(TANK_FOOTPRINT)?,
        liquid_specific_heat_capacity: lookup(LIQUID_SPECIFIC_HEAT_CAPACITY)?,
    };

    Ok(ResolvedParameters { values, provenance })
}

fn resolve_single_parameter<S>(
    store: &S,
    config: &PipelineConfig,
    definition: &ParameterDefinition,
) -> Result<(f64, ParameterSource)>
where
    S: DataStore + ?Sized,
{
    if let Some(&value) = config.parameters.get(definition.code) {
        return Ok((value, ParameterSource::Override));
    }

    let group = match definition.scope {
        ParameterScope::Tank => Some(config.source.tank_group()),
        ParameterScope::Brewing => Some(config.source.brewing_group().to_string()),
        ParameterScope::Liquid => None,
    };

    match group {
        Some(group) => {
            if let Some(value) = store.read_scalar_attribute(&group, definition.key)? {
                return Ok((value, ParameterSource::Store));
            }
            match definition.default_value {
                Some(default) => {
                    warn!(
                        stage = "resolve_parameters",
                        parameter = definition.code,
                        attribute = definition.key,
                        group = %group,
                        default,
                        "attribute missing, using default"
                    );
                    Ok((default, ParameterSource::Default))
                }
                None => Err(PipelineError::invalid_parameter(
                    definition.code,
                    format!(
                        "required attribute '{}' not found on group '{}'",
                        definition.key, group
                    ),
                )),
            }
        }
        None => {
            if let Some(value) = config.liquid.get(definition.key) {
                return Ok((value, ParameterSource::Configuration));
            }
            definition
                .default_value
                .map(|default| (default, ParameterSource::Default))
                .ok_or_else(|| {
                    PipelineError::invalid_parameter(
                        definition.code,
                        format!("liquid.{} is not configured", definition.key),
                    )
                })
        }
    }
}
