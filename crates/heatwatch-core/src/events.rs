//! Outbound notification events.
//!
//! Every externally visible state change produces an [`Event`]. Delivery is
//! fire-and-forget through a [`Notifier`]: a slow or absent channel must
//! never block or fail core logic, so the trait is infallible and the engine
//! calls it while holding its lock only for in-process sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::LogEntry;
use crate::policy::ZoneId;
use crate::state::{Status, SystemStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker's cycle state changed.
    StatusChanged {
        username: String,
        status: Status,
        zone: Option<ZoneId>,
        at: DateTime<Utc>,
    },
    /// A work window elapsed; rest is now pending.
    WorkComplete {
        username: String,
        zone: Option<ZoneId>,
        at: DateTime<Utc>,
    },
    /// Escalating reminder: rest is still pending.
    RestReminder {
        username: String,
        /// How long the work window has been over.
        overdue_secs: i64,
        at: DateTime<Utc>,
    },
    /// An entry was appended to the activity log.
    HistoryAppended { entry: LogEntry },
    /// Cutoff / mandatory-rest state changed.
    SystemStatusChanged {
        system: SystemStatus,
        at: DateTime<Utc>,
    },
}

/// External notification channel. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Discards every event (the default for embedded/sweep deployments).
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) {}
}
