use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("node at '{path}' is not a {expected}")]
    NodeKind {
        path: String,
        expected: &'static str,
    },

    #[error("attribute '{key}' on '{path}' rejected: {reason}")]
    InvalidAttribute {
        path: String,
        key: String,
        reason: String,
    },

    #[error("store file {path} I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store document could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table conversion failed: {0}")]
    Polars(#[from] PolarsError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
