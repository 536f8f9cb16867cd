//! Directory path management for mortar
//!
//! All paths used by the CLI are centralized here. Set `MORTAR_CONFIG_DIR`
//! to move the whole directory, e.g. in tests.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the base directory
pub const CONFIG_DIR_ENV: &str = "MORTAR_CONFIG_DIR";

/// Get the base mortar directory (~/.config/mortar/)
pub fn get_mortar_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::config_dir()
        .context("Failed to get config directory")?
        .join("mortar"))
}

/// Get the config file path (~/.config/mortar/config.toml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_mortar_dir()?.join("config.toml"))
}
