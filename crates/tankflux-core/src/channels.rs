use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Level,
    Temperature,
    Timestamp,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [
        ChannelKind::Level,
        ChannelKind::Temperature,
        ChannelKind::Timestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Level => "level",
            ChannelKind::Temperature => "temperature",
            ChannelKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ChannelKind {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "level" => Ok(ChannelKind::Level),
            "temperature" => Ok(ChannelKind::Temperature),
            "timestamp" => Ok(ChannelKind::Timestamp),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

/// Channel arrays exactly as read from the store: lengths may differ, values may be NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChannels {
    channels: BTreeMap<ChannelKind, Vec<f64>>,
}

impl RawChannels {
    pub fn new(level: Vec<f64>, temperature: Vec<f64>, timestamp: Vec<f64>) -> Self {
        let mut channels = BTreeMap::new();
        channels.insert(ChannelKind::Level, level);
        channels.insert(ChannelKind::Temperature, temperature);
        channels.insert(ChannelKind::Timestamp, timestamp);
        Self { channels }
    }

    pub fn insert(&mut self, kind: ChannelKind, values: Vec<f64>) {
        self.channels.insert(kind, values);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&[f64]> {
        self.channels.get(&kind).map(Vec::as_slice)
    }

    pub fn require(&self, kind: ChannelKind) -> Result<&[f64]> {
        self.get(kind)
            .ok_or(PipelineError::RequiredChannelMissing { channel: kind })
    }
}

/// A time axis in seconds plus value channels of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    channels: BTreeMap<ChannelKind, Vec<f64>>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>) -> Self {
        Self {
            time,
            channels: BTreeMap::new(),
        }
    }

    /// Adds a value channel; its length must match the time axis.
    pub fn with_channel(mut self, kind: ChannelKind, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.time.len() {
            return Err(PipelineError::LengthMismatch {
                lengths: vec![
                    ("time".to_string(), self.time.len()),
                    (kind.to_string(), values.len()),
                ],
            });
        }
        self.channels.insert(kind, values);
        Ok(self)
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<&[f64]> {
        self.channels.get(&kind).map(Vec::as_slice)
    }

    pub fn require(&self, kind: ChannelKind) -> Result<&[f64]> {
        self.channel(kind)
            .ok_or(PipelineError::RequiredChannelMissing { channel: kind })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Keeps the first `len` samples of the time axis and every channel.
    pub fn truncated(&self, len: usize) -> TimeSeries {
        let keep = len.min(self.time.len());
        TimeSeries {
            time: self.time[..keep].to_vec(),
            channels: self
                .channels
                .iter()
                .map(|(kind, values)| (*kind, values[..keep].to_vec()))
                .collect(),
        }
    }
}
