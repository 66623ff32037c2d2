use tracing::{debug, info};

use crate::channels::{ChannelKind, TimeSeries};
use crate::error::{PipelineError, Result};

/// Output of the cleaning stage. The level keeps its own (possibly shorter) time axis because
/// dropping negative samples realigns it against the front of the original time channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedChannels {
    pub temperature: TimeSeries,
    pub level: TimeSeries,
}

impl CleanedChannels {
    pub fn temperature_values(&self) -> Result<&[f64]> {
        self.temperature.require(ChannelKind::Temperature)
    }

    pub fn level_values(&self) -> Result<&[f64]> {
        self.level.require(ChannelKind::Level)
    }
}

/// Repairs missing samples in level and temperature, then drops physically invalid
/// (negative) levels.
pub fn clean_channels(series: &TimeSeries) -> Result<CleanedChannels> {
    let time = series.time();

    let temperature = interpolate_missing(
        time,
        series.require(ChannelKind::Temperature)?,
        ChannelKind::Temperature,
    )?;
    let level = interpolate_missing(
        time,
        series.require(ChannelKind::Level)?,
        ChannelKind::Level,
    )?;

    let kept = remove_negatives(&level);
    let removed = level.len() - kept.len();
    if removed > 0 {
        info!(
            stage = "clean",
            channel = %ChannelKind::Level,
            removed,
            "dropped negative samples"
        );
    }

    let realigned = realign(time, kept, ChannelKind::Level)?;
    let level_values = interpolate_missing(
        realigned.time(),
        realigned.require(ChannelKind::Level)?,
        ChannelKind::Level,
    )?;
    let level = TimeSeries::new(realigned.time().to_vec())
        .with_channel(ChannelKind::Level, level_values)?;

    let temperature = TimeSeries::new(time.to_vec())
        .with_channel(ChannelKind::Temperature, temperature)?;

    info!(
        stage = "clean",
        temperature_samples = temperature.len(),
        level_samples = level.len(),
        "channels cleaned"
    );

    Ok(CleanedChannels { temperature, level })
}

/// Drops negative samples. NaN samples are kept so interpolation can repair them.
pub fn remove_negatives(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_nan() || *value >= 0.0)
        .collect()
}

/// Pairs sample `i` of a shortened channel with `time[i]` (index-based join, no resampling).
pub fn realign(time: &[f64], values: Vec<f64>, kind: ChannelKind) -> Result<TimeSeries> {
    if values.len() > time.len() {
        return Err(PipelineError::LengthMismatch {
            lengths: vec![
                ("time".to_string(), time.len()),
                (kind.to_string(), values.len()),
            ],
        });
    }
    TimeSeries::new(time[..values.len()].to_vec()).with_channel(kind, values)
}

/// Fills NaN samples by piecewise-linear interpolation over `time`, holding the first and last
/// valid values flat beyond the valid range.
pub fn interpolate_missing(time: &[f64], values: &[f64], channel: ChannelKind) -> Result<Vec<f64>> {
    if time.len() != values.len() {
        return Err(PipelineError::LengthMismatch {
            lengths: vec![
                ("time".to_string(), time.len()),
                (channel.to_string(), values.len()),
            ],
        });
    }

    if values.is_empty() {
        return Err(PipelineError::AllMissing { channel });
    }

    let missing = values.iter().filter(|value| value.is_nan()).count();
    if missing == 0 {
        debug!(stage = "clean", channel = %channel, "no missing samples");
        return Ok(values.to_vec());
    }
    if missing == values.len() {
        return Err(PipelineError::AllMissing { channel });
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = time
        .iter()
        .zip(values)
        .filter(|(_, value)| !value.is_nan())
        .map(|(t, value)| (*t, *value))
        .unzip();

    let result: Vec<f64> = time.iter().map(|&t| interpolate_at(&xs, &ys, t)).collect();

    let remaining = result.iter().filter(|value| value.is_nan()).count();
    if remaining > 0 {
        return Err(PipelineError::InterpolationInvariant { channel, remaining });
    }

    info!(stage = "clean", channel = %channel, missing, "interpolated missing samples");
    Ok(result)
}

fn interpolate_at(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }

    let upper = xs.partition_point(|&x| x <= t).clamp(1, last);
    let lower = upper - 1;
    let span = xs[upper] - xs[lower];
    if span <= 0.0 {
        return ys[lower];
    }
    ys[lower] + (ys[upper] - ys[lower]) * (t - xs[lower]) / span
}
