mod config;
mod store;

pub use config::{Config, CutoffConfig, ReminderConfig, UndoConfig};
pub use store::{JsonFileStore, NullStore, StateStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/heatwatch[-dev]/` based on HEATWATCH_ENV.
///
/// Set HEATWATCH_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HEATWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("heatwatch-dev")
    } else {
        base_dir.join("heatwatch")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
