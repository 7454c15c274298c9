//! Application configuration loaded from `~/.config/listado/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::EngineConfig;

/// Top-level configuration file. Every field is optional; a missing file
/// yields all defaults so the CLI works with nothing but flags.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// URL of the supplier price-list PDF for `listado sync`.
    pub source_url: Option<String>,
    /// Target spreadsheet for the sheet sink.
    pub spreadsheet_id: Option<String>,
    /// Worksheet name within the spreadsheet.
    pub sheet_name: Option<String>,
    /// Engine policy overrides.
    pub engine: EngineConfig,
}

/// Load the config file, or defaults if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load() -> Result<AppConfig> {
    load_from(&config_path())
}

fn load_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Return the path to the config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("listado")
        .join("config.toml")
}
