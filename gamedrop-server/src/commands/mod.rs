//! CLI command implementations

pub mod accounts;
pub mod activity;
pub mod counts;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gamedrop_core::GamedropContext;

/// Data directory from `--data-dir` / `GAMEDROP_DIR`, else `~/.gamedrop`
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::home_dir()
            .map(|home| home.join(".gamedrop"))
            .context("Could not find home directory; pass --data-dir"),
    }
}

pub fn get_context(data_dir: &Path) -> Result<GamedropContext> {
    GamedropContext::new(data_dir)
        .with_context(|| format!("Failed to open gamedrop data in {}", data_dir.display()))
}
