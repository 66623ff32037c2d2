use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::channels::{ChannelKind, RawChannels, TimeSeries};
use crate::error::{PipelineError, Result};

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Truncates all channels to their common length and builds a time series whose time axis
/// is in seconds, starts at zero and never decreases.
pub fn align_channels(raw: &RawChannels) -> Result<TimeSeries> {
    let mut truncated = Vec::with_capacity(ChannelKind::ALL.len());
    for kind in ChannelKind::ALL {
        truncated.push((kind, raw.require(kind)?));
    }

    let min_length = truncated
        .iter()
        .map(|(_, values)| values.len())
        .min()
        .unwrap_or(0);
    if min_length == 0 {
        return Err(PipelineError::EmptyInput);
    }

    let truncated: Vec<(ChannelKind, Vec<f64>)> = truncated
        .into_iter()
        .map(|(kind, values)| {
            if values.len() > min_length {
                debug!(
                    stage = "align",
                    channel = %kind,
                    dropped = values.len() - min_length,
                    "truncating channel"
                );
            }
            (kind, values[..min_length].to_vec())
        })
        .collect();

    check_equal_length(&truncated)?;

    let mut time = Vec::new();
    let mut values = Vec::new();
    for (kind, channel) in truncated {
        if kind == ChannelKind::Timestamp {
            time = normalize_timestamps(&channel);
        } else {
            values.push((kind, channel));
        }
    }

    if !is_strictly_increasing(&time) {
        let permutation = sort_permutation(&time);
        time = apply_permutation(&time, &permutation);
        for (_, channel) in values.iter_mut() {
            *channel = apply_permutation(channel, &permutation);
        }
        if let Some(&first) = time.first() {
            for t in time.iter_mut() {
                *t -= first;
            }
        }

        if let Some(index) = first_decrease(&time) {
            return Err(PipelineError::NonMonotonicTime { index });
        }
        let duplicates = time.windows(2).filter(|pair| pair[0] == pair[1]).count();
        if duplicates > 0 {
            warn!(stage = "align", duplicates, "duplicate timestamps kept after sorting");
        }
        info!(stage = "align", samples = time.len(), "reordered samples by time");
    }

    let mut series = TimeSeries::new(time);
    for (kind, channel) in values {
        series = series.with_channel(kind, channel)?;
    }

    info!(stage = "align", samples = series.len(), "channels aligned");
    Ok(series)
}

/// Milliseconds to seconds relative to the first sample.
pub fn normalize_timestamps(millis: &[f64]) -> Vec<f64> {
    let Some(&first) = millis.first() else {
        return Vec::new();
    };
    let origin = first / MILLIS_PER_SECOND;
    millis
        .iter()
        .map(|t| t / MILLIS_PER_SECOND - origin)
        .collect()
}

pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}

/// Index of the first sample that is smaller than (or unordered with) its predecessor.
fn first_decrease(values: &[f64]) -> Option<usize> {
    values
        .windows(2)
        .position(|pair| {
            !matches!(
                pair[0].partial_cmp(&pair[1]),
                Some(Ordering::Less | Ordering::Equal)
            )
        })
        .map(|position| position + 1)
}

/// Stable ordering of sample indices by time.
fn sort_permutation(time: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..time.len()).collect();
    order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
    order
}

fn apply_permutation(values: &[f64], permutation: &[usize]) -> Vec<f64> {
    permutation.iter().map(|&index| values[index]).collect()
}

fn check_equal_length(channels: &[(ChannelKind, Vec<f64>)]) -> Result<()> {
    let Some((_, first)) = channels.first() else {
        return Ok(());
    };
    if channels.iter().all(|(_, values)| values.len() == first.len()) {
        return Ok(());
    }
    Err(PipelineError::LengthMismatch {
        lengths: channels
            .iter()
            .map(|(kind, values)| (kind.to_string(), values.len()))
            .collect(),
    })
}
