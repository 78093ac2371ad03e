//! Append-only activity log.
//!
//! Every state transition appends one entry; prior entries are never
//! mutated. Insertion order is chronological order, and the audit views
//! consume [`ActivityLog::all`] directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::ZoneId;

/// What happened. Closed set; audit consumers match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SetZone,
    StartRest,
    CompletedWork,
    CompletedRest,
    EarlyCompletion,
    CutoffActivated,
    MandatoryRest,
    Reset,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    /// Absent for system-wide entries (mandatory rest, log reset).
    pub username: Option<String>,
    pub action: Action,
    pub zone: Option<ZoneId>,
    pub details: String,
}

impl LogEntry {
    pub fn new(
        at: DateTime<Utc>,
        username: Option<&str>,
        action: Action,
        zone: Option<ZoneId>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
            username: username.map(str::to_string),
            action,
            zone,
            details: details.into(),
        }
    }
}

/// Append-only record of every transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) append.
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Full ordered sequence, oldest first.
    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the log, leaving a single entry recording the reset itself.
    /// Capability is checked by the engine before this is called.
    pub fn reset(&mut self, at: DateTime<Utc>, actor: &str) -> LogEntry {
        self.entries.clear();
        let entry = LogEntry::new(
            at,
            Some(actor),
            Action::Reset,
            None,
            "activity log cleared",
        );
        self.entries.push(entry.clone());
        entry
    }
}
