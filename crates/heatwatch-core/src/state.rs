//! Live per-worker and system-wide state records.
//!
//! A [`CycleState`] is exclusively owned and mutated by the engine under its
//! lock; callers only ever see clones inside a snapshot. Timestamps are
//! absolute `DateTime<Utc>` -- no time-of-day strings, so windows spanning
//! midnight compare correctly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::policy::ZoneId;

/// Where a worker sits in the work/rest cycle.
///
/// `Idle -> Working -> Resting -> Idle`; `Monitoring` is the non-cycling
/// state for authority roles. "Awaiting rest" is not a separate status:
/// work completion is advisory, so the worker stays `Working` with
/// `pending_rest` set (see [`CycleState::is_awaiting_rest`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Working,
    Resting,
    Monitoring,
}

/// Optional worker coordinates, caller-supplied with a zone assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One worker's live cycle state, keyed by username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    pub role: Role,
    pub status: Status,
    pub zone: Option<ZoneId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<Coordinates>,
    pub work_completed: bool,
    pub pending_rest: bool,
    /// Work-crew label, set at registration. Survives cycle clears; only a
    /// re-registration changes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl CycleState {
    /// Fresh state for a newly registered user. Authority roles monitor;
    /// everyone else starts idle.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            status: if role.is_authority() {
                Status::Monitoring
            } else {
                Status::Idle
            },
            zone: None,
            start: None,
            end: None,
            location: None,
            work_completed: false,
            pending_rest: false,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Drop any active cycle: back to idle (or monitoring, for authority
    /// roles) with zone, window and flags cleared.
    pub fn clear_cycle(&mut self) {
        self.status = if self.role.is_authority() {
            Status::Monitoring
        } else {
            Status::Idle
        };
        self.zone = None;
        self.start = None;
        self.end = None;
        self.work_completed = false;
        self.pending_rest = false;
    }

    /// Work window elapsed but the worker has not started resting.
    pub fn is_awaiting_rest(&self) -> bool {
        self.status == Status::Working && self.pending_rest
    }

    /// Whether the worker is mid-cycle (has a live work or rest window).
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Working | Status::Resting)
    }
}

/// Process-wide cutoff state. Owned by the cutoff controller; exactly one
/// instance per engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Organization-wide stand-down in force.
    pub cutoff_active: bool,
    /// End of the post-cutoff mandatory rest window, if one is running.
    pub cutoff_end: Option<DateTime<Utc>>,
    /// Mandatory rest window in force (cutoff released, cooldown running).
    pub mandatory_rest: bool,
}

impl SystemStatus {
    /// Whether the mandatory rest window still holds at `now`.
    pub fn mandatory_rest_holds(&self, now: DateTime<Utc>) -> bool {
        self.mandatory_rest && self.cutoff_end.is_some_and(|end| now < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_state_matches_role() {
        assert_eq!(CycleState::new(Role::Trainer).status, Status::Idle);
        assert_eq!(
            CycleState::new(Role::SafetyOfficer).status,
            Status::Monitoring
        );
    }

    #[test]
    fn clear_cycle_resets_everything() {
        let mut state = CycleState::new(Role::Trainer);
        state.status = Status::Working;
        state.zone = Some(ZoneId::Yellow);
        state.start = Some(Utc::now());
        state.end = Some(Utc::now());
        state.work_completed = true;
        state.pending_rest = true;
        state.clear_cycle();
        assert_eq!(state, CycleState::new(Role::Trainer));
    }

    #[test]
    fn group_survives_cycle_clear() {
        let mut state = CycleState::new(Role::Trainer).with_group("north-crew");
        state.status = Status::Working;
        state.zone = Some(ZoneId::Red);
        state.clear_cycle();
        assert_eq!(state.status, Status::Idle);
        assert_eq!(state.group.as_deref(), Some("north-crew"));
    }

    #[test]
    fn mandatory_rest_window_expires() {
        let now = Utc::now();
        let status = SystemStatus {
            cutoff_active: false,
            cutoff_end: Some(now + Duration::minutes(30)),
            mandatory_rest: true,
        };
        assert!(status.mandatory_rest_holds(now));
        assert!(!status.mandatory_rest_holds(now + Duration::minutes(31)));
    }
}
