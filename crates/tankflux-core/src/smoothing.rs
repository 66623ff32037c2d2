use tracing::debug;

use crate::error::{PipelineError, Result};

/// Moving average over exactly `window` samples with edge replication.
///
/// The input is padded by `window / 2` copies of its first and last value, and output `j` is
/// the mean of `padded[j..j + window]`. Odd windows are centered. Even windows lean one sample
/// towards the past. The output always has the input's length.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(PipelineError::InvalidWindow(window));
    }
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return Ok(Vec::new());
    };

    let pad = window / 2;
    let mut padded = Vec::with_capacity(values.len() + 2 * pad);
    padded.extend(std::iter::repeat(first).take(pad));
    padded.extend_from_slice(values);
    padded.extend(std::iter::repeat(last).take(pad));

    let width = window as f64;
    let smoothed: Vec<f64> = (0..values.len())
        .map(|start| padded[start..start + window].iter().sum::<f64>() / width)
        .collect();

    debug!(stage = "smooth", window, samples = smoothed.len(), "moving average applied");
    Ok(smoothed)
}
