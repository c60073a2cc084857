//! Subcommand handlers. Each returns the text to print.

pub mod due;
pub mod inspect;
pub mod inventory;

use anyhow::{Context, Result};
use cpa_sync::CpaSyncConfig;
use std::path::Path;

/// Load the TOML config at `path`, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<CpaSyncConfig> {
    match path {
        Some(path) => CpaSyncConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(CpaSyncConfig::default()),
    }
}

/// Remote directory that maps onto a local `--root`
pub(crate) const ROOT_DIRECTORY: &str = "/";
