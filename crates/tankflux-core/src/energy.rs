//! Heat and energy quantities of the tank contents.
//!
//! Every function checks its operands first, so a NaN or infinite input surfaces as
//! [`PipelineError::InvalidParameter`] naming the offending operand instead of flowing
//! silently into the result table.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::parameters::PhysicalParameters;

/// Internal energy per time step, in joules.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyTrace {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl EnergyTrace {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PipelineError::invalid_parameter(
            name,
            format!("expected a finite value, got {value}"),
        ))
    }
}

fn finite_at(name: &str, index: usize, value: f64) -> Result<f64> {
    finite(&format!("{name}[{index}]"), value)
}

/// Heat supplied by the heater, `power * efficiency` (W).
pub fn heater_heat_flux(power: f64, efficiency: f64) -> Result<f64> {
    Ok(finite("heater_power", power)? * finite("heater_efficiency", efficiency)?)
}

/// Convective loss through the tank wall, `k * area * (t - t_env)` (W).
pub fn convective_heat_loss(
    heat_transfer_coefficient: f64,
    surface_area: f64,
    temperature: f64,
    ambient_temperature: f64,
) -> Result<f64> {
    let k = finite("heat_transfer_coefficient", heat_transfer_coefficient)?;
    let area = finite("surface_area", surface_area)?;
    let t = finite("temperature", temperature)?;
    let t_env = finite("ambient_temperature", ambient_temperature)?;
    Ok(k * area * (t - t_env))
}

/// Liquid mass per sample, `level * footprint * density` (kg).
pub fn mass(level: &[f64], footprint: f64, density: f64) -> Result<Vec<f64>> {
    let footprint = finite("footprint", footprint)?;
    let density = finite("density", density)?;
    level
        .iter()
        .enumerate()
        .map(|(index, &value)| Ok(finite_at("level", index, value)? * footprint * density))
        .collect()
}

/// `mass * specific_heat_capacity * temperature` (J).
pub fn enthalpy(mass: f64, specific_heat_capacity: f64, temperature: f64) -> Result<f64> {
    Ok(finite("mass", mass)?
        * finite("specific_heat_capacity", specific_heat_capacity)?
        * finite("temperature", temperature)?)
}

/// Energy stored in the empty tank shell at ambient temperature (`E_0`).
pub fn initial_internal_energy(params: &PhysicalParameters) -> Result<f64> {
    enthalpy(
        params.tank_mass,
        params.tank_specific_heat_capacity,
        params.ambient_temperature,
    )
}

/// Computes `E[i] = Q_in - Q_out[i] + H_in[i] + E_0` for the common prefix of the inputs.
///
/// `mass` is the mass derived from a smoothed level, while `temperature` is the cleaned but
/// unsmoothed temperature: both the wall loss and the liquid enthalpy are evaluated at it.
///
/// The heat terms are instantaneous rates and are not integrated over time, so the result is
/// not a running energy balance. Keep it that way: existing reports were produced with this
/// per-sample form.
pub fn internal_energy_trace(
    params: &PhysicalParameters,
    time: &[f64],
    mass: &[f64],
    temperature: &[f64],
) -> Result<EnergyTrace> {
    let len = mass.len().min(temperature.len()).min(time.len());

    let heat_in = heater_heat_flux(params.heater_power, params.heater_efficiency)?;
    let initial = initial_internal_energy(params)?;

    let mut values = Vec::with_capacity(len);
    for index in 0..len {
        let t = finite_at("temperature", index, temperature[index])?;
        let m = finite_at("mass", index, mass[index])?;
        let heat_out = convective_heat_loss(
            params.heat_transfer_coefficient,
            params.surface_area,
            t,
            params.ambient_temperature,
        )?;
        let enthalpy_in = enthalpy(m, params.liquid_specific_heat_capacity, t)?;
        values.push(heat_in - heat_out + enthalpy_in + initial);
    }

    debug!(stage = "energy", samples = len, "internal energy trace computed");
    Ok(EnergyTrace {
        time: time[..len].to_vec(),
        values,
    })
}
