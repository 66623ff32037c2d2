// crates/tankflux/src/commands/mod.rs

use std::path::PathBuf;

use anyhow::{anyhow, Result};

pub mod import;
pub mod run;
pub mod show;

/// Command-line store path, else the configured one.
pub(crate) fn resolve_store_path(
    explicit: Option<PathBuf>,
    configured: Option<&PathBuf>,
    what: &str,
) -> Result<PathBuf> {
    explicit
        .or_else(|| configured.cloned())
        .ok_or_else(|| anyhow!("no {what} store given; pass --store or set it in the configuration"))
}
