// crates/tankflux-core/src/error.rs

use tankflux_store::StoreError;
use thiserror::Error;

use crate::channels::ChannelKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("required channel '{channel}' is missing")]
    RequiredChannelMissing { channel: ChannelKind },

    #[error("input channels contain no samples")]
    EmptyInput,

    #[error("channel lengths differ after truncation: {lengths:?}")]
    LengthMismatch { lengths: Vec<(String, usize)> },

    #[error("time axis is not ordered at index {index} even after sorting")]
    NonMonotonicTime { index: usize },

    #[error("channel '{channel}' has no valid samples to interpolate from")]
    AllMissing { channel: ChannelKind },

    #[error("interpolation left {remaining} missing samples in channel '{channel}'")]
    InterpolationInvariant {
        channel: ChannelKind,
        remaining: usize,
    },

    #[error("moving-average window must be positive, got {0}")]
    InvalidWindow(usize),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error("data store error: {0}")]
    Store(#[from] StoreError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
