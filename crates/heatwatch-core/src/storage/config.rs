//! TOML-based application configuration.
//!
//! Carries the zone policy table (with optional WBGT thresholds), cutoff
//! stand-down and mandatory-rest durations, rest-reminder timings, the undo
//! depth, and the optional shared secret gating authority registration.
//!
//! Configuration is stored at `~/.config/heatwatch/config.toml` and loaded
//! once at startup; defaults are compiled in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::engine::Timings;
use crate::error::ConfigError;
use crate::policy::{ZonePolicy, ZonePolicyTable};

/// Cutoff controller timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffConfig {
    /// Forced stand-down rest length when cutoff activates.
    #[serde(default = "default_stand_down_min")]
    pub stand_down_min: u64,
    /// Mandatory rest window after cutoff release.
    #[serde(default = "default_mandatory_rest_min")]
    pub mandatory_rest_min: u64,
}

/// Rest-reminder escalation timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Delay from work completion to the first reminder.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Re-arm interval while rest stays pending.
    #[serde(default = "default_repeat_secs")]
    pub repeat_secs: u64,
}

/// Undo ledger sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoConfig {
    #[serde(default = "default_undo_depth")]
    pub depth: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/heatwatch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Zone table override; empty means the built-in production table.
    #[serde(default)]
    pub zones: Vec<ZonePolicy>,
    #[serde(default)]
    pub cutoff: CutoffConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    /// Shared secret required to register an authority role, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_secret: Option<String>,
}

impl Config {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Load from the default path, falling back to defaults if the file does
    /// not exist or cannot be parsed.
    pub fn load_or_default() -> Self {
        Self::config_path()
            .and_then(|path| Self::load(&path))
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Build the validated policy table (built-in when no override given).
    pub fn policy_table(&self) -> Result<ZonePolicyTable, ConfigError> {
        if self.zones.is_empty() {
            Ok(ZonePolicyTable::builtin())
        } else {
            ZonePolicyTable::from_zones(self.zones.clone())
        }
    }

    pub fn timings(&self) -> Timings {
        Timings {
            stand_down_min: self.cutoff.stand_down_min,
            mandatory_rest_min: self.cutoff.mandatory_rest_min,
            reminder_initial_secs: self.reminders.initial_delay_secs,
            reminder_repeat_secs: self.reminders.repeat_secs,
            undo_depth: self.undo.depth,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            cutoff: CutoffConfig::default(),
            reminders: ReminderConfig::default(),
            undo: UndoConfig::default(),
            authority_secret: None,
        }
    }
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            stand_down_min: default_stand_down_min(),
            mandatory_rest_min: default_mandatory_rest_min(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            repeat_secs: default_repeat_secs(),
        }
    }
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            depth: default_undo_depth(),
        }
    }
}

fn default_stand_down_min() -> u64 {
    30
}

fn default_mandatory_rest_min() -> u64 {
    30
}

fn default_initial_delay_secs() -> u64 {
    180
}

fn default_repeat_secs() -> u64 {
    10
}

fn default_undo_depth() -> usize {
    crate::undo::DEFAULT_UNDO_DEPTH
}
