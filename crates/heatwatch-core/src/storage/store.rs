//! Write-through snapshot persistence.
//!
//! The engine's in-memory state stays authoritative for the process
//! lifetime; the store only receives copies after each mutation and is read
//! back once at startup. Store failures never fail an operation -- the
//! engine logs and continues.

use std::path::{Path, PathBuf};

use crate::engine::EngineSnapshot;
use crate::error::{ConfigError, StoreError};
use crate::history::LogEntry;

/// Durable sink for engine snapshots and the audit trail.
pub trait StateStore: Send + Sync {
    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError>;
    fn load(&self) -> Result<Option<EngineSnapshot>, StoreError>;

    /// Write-through for a single activity log entry. Defaults to a no-op;
    /// the snapshot already carries the in-memory log.
    fn append_entry(&self, entry: &LogEntry) -> Result<(), StoreError> {
        let _ = entry;
        Ok(())
    }
}

/// Persists nothing (in-memory only deployments, tests).
pub struct NullStore;

impl StateStore for NullStore {
    fn save(&self, _snapshot: &EngineSnapshot) -> Result<(), StoreError> {
        Ok(())
    }

    fn load(&self) -> Result<Option<EngineSnapshot>, StoreError> {
        Ok(None)
    }
}

/// JSON state file, one snapshot per save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/heatwatch/state.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(super::data_dir()?.join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        // Write-then-rename so a crash mid-write leaves the old file intact.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<EngineSnapshot>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends one JSON line per entry to `history.jsonl` next to the state
    /// file. Not cleared by an in-memory log reset.
    fn append_entry(&self, entry: &LogEntry) -> Result<(), StoreError> {
        use std::io::Write;
        let path = self.path.with_file_name("history.jsonl");
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}
