//! Organization-wide cutoff control.
//!
//! Sits above the per-worker cycle machine: activation forces every
//! subordinate into stand-down, release starts a mandatory rest window
//! during which non-authority actors still cannot start work. Both phases
//! and the `permits` gate run under the same engine lock as the cycle
//! transitions, so a zone assignment can never race a cutoff activation
//! mid-check.

use chrono::{DateTime, Utc};

use crate::alarm::{AlarmKind, SYSTEM_KEY};
use crate::auth::Role;
use crate::engine::{arm, push_log, role_of, CoreState, Engine};
use crate::error::{EngineError, Result};
use crate::events::Event;
use crate::history::{Action, LogEntry};
use crate::policy::ZoneId;
use crate::state::{Status, SystemStatus};

/// Gate consulted before every zone assignment.
pub(crate) fn permits(system: &SystemStatus, role: Role, now: DateTime<Utc>) -> Result<()> {
    if role.is_authority() {
        return Ok(());
    }
    if system.cutoff_active {
        return Err(EngineError::CutoffBlocked);
    }
    if system.mandatory_rest_holds(now) {
        return Err(EngineError::MandatoryRestBlocked);
    }
    Ok(())
}

impl Engine {
    /// Flip the organization-wide cutoff. Authority only.
    ///
    /// Inactive -> active: every subordinate is forced into a stand-down
    /// rest window on the `cutoff` zone. Active -> inactive: a mandatory
    /// rest window starts; its expiry is driven by a one-shot alarm (or the
    /// sweep). Returns the resulting system status.
    pub fn toggle_cutoff(&self, actor: &str) -> Result<SystemStatus> {
        self.toggle_cutoff_at(actor, Utc::now())
    }

    pub fn toggle_cutoff_at(&self, actor: &str, now: DateTime<Utc>) -> Result<SystemStatus> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let role = role_of(&st, actor).ok_or(EngineError::Unauthorized)?;
        if !shared.guard.can_toggle_cutoff(role) {
            return Err(EngineError::Unauthorized);
        }

        if !st.system.cutoff_active {
            let stand_down = shared.timings.stand_down();
            let end = now + stand_down;
            let subordinates: Vec<String> = st
                .users
                .iter()
                .filter(|(_, u)| !u.role.is_authority())
                .map(|(name, _)| name.clone())
                .collect();
            for name in subordinates {
                let was_active = {
                    let CoreState { users, undo, .. } = &mut *st;
                    let Some(user) = users.get_mut(&name) else {
                        continue;
                    };
                    let was_active = user.is_active();
                    undo.push(&name, user.clone());
                    user.status = Status::Resting;
                    user.zone = Some(ZoneId::Cutoff);
                    user.start = Some(now);
                    user.end = Some(end);
                    user.work_completed = false;
                    user.pending_rest = false;
                    was_active
                };
                if was_active {
                    push_log(
                        &shared,
                        &mut st.history,
                        LogEntry::new(
                            now,
                            Some(&name),
                            Action::CutoffActivated,
                            Some(ZoneId::Cutoff),
                            "forced stand-down",
                        ),
                    );
                }
                arm(&shared, &mut st, &name, AlarmKind::RestComplete, end);
            }
            st.system.cutoff_active = true;
            st.system.cutoff_end = None;
            st.system.mandatory_rest = false;
            st.alarms.cancel(SYSTEM_KEY);
        } else {
            let end = now + shared.timings.mandatory_rest();
            st.system.cutoff_active = false;
            st.system.cutoff_end = Some(end);
            st.system.mandatory_rest = true;
            push_log(
                &shared,
                &mut st.history,
                LogEntry::new(
                    now,
                    None,
                    Action::MandatoryRest,
                    None,
                    "cutoff released; mandatory rest window started",
                ),
            );
            arm(&shared, &mut st, SYSTEM_KEY, AlarmKind::MandatoryRestExpiry, end);
        }

        shared.notifier.notify(&Event::SystemStatusChanged {
            system: st.system,
            at: now,
        });
        shared.persist(&st);
        Ok(st.system)
    }

    /// Authority-only, idempotent: reset the system status and force every
    /// subordinate back to idle with cleared zone and timers, regardless of
    /// the current cutoff state.
    pub fn clear_commands(&self, actor: &str) -> Result<()> {
        self.clear_commands_at(actor, Utc::now())
    }

    pub fn clear_commands_at(&self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let role = role_of(&st, actor).ok_or(EngineError::Unauthorized)?;
        if !shared.guard.can_reset(role) {
            return Err(EngineError::Unauthorized);
        }

        st.alarms.clear();
        st.undo.clear();
        st.system = SystemStatus::default();
        for user in st.users.values_mut() {
            user.clear_cycle();
        }

        shared.notifier.notify(&Event::SystemStatusChanged {
            system: st.system,
            at: now,
        });
        shared.persist(&st);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSnapshot;
    use crate::policy::ZonePolicyTable;

    fn engine() -> Engine {
        let engine = Engine::new(ZonePolicyTable::builtin());
        engine.register("officer", Role::SafetyOfficer, None, None).unwrap();
        engine.register("alice", Role::Trainer, None, None).unwrap();
        engine.register("bob", Role::Trainer, None, None).unwrap();
        engine
    }

    fn worker_states(snapshot: &EngineSnapshot) -> Vec<(&String, Status)> {
        let mut states: Vec<_> = snapshot
            .users
            .iter()
            .filter(|(_, u)| !u.role.is_authority())
            .map(|(name, u)| (name, u.status))
            .collect();
        states.sort();
        states
    }

    #[test]
    fn activation_forces_stand_down() {
        let engine = engine();
        let now = Utc::now();
        engine
            .set_zone_at("alice", "alice", ZoneId::Yellow, None, now)
            .unwrap();

        let system = engine.toggle_cutoff_at("officer", now).unwrap();
        assert!(system.cutoff_active);
        assert!(system.cutoff_end.is_none());

        let snap = engine.snapshot_at(now);
        for (_, user) in snap.users.iter().filter(|(_, u)| !u.role.is_authority()) {
            assert_eq!(user.status, Status::Resting);
            assert_eq!(user.zone, Some(ZoneId::Cutoff));
        }
        // Only alice was mid-cycle, so only she gets a log entry.
        let activated: Vec<_> = snap
            .history
            .all()
            .iter()
            .filter(|e| e.action == Action::CutoffActivated)
            .collect();
        assert_eq!(activated.len(), 1);
        assert_eq!(activated[0].username.as_deref(), Some("alice"));
    }

    #[test]
    fn toggle_requires_authority() {
        let engine = engine();
        assert!(matches!(
            engine.toggle_cutoff("alice"),
            Err(EngineError::Unauthorized)
        ));
    }

    #[test]
    fn release_starts_mandatory_rest_window() {
        let engine = engine();
        let now = Utc::now();
        engine.toggle_cutoff_at("officer", now).unwrap();
        let system = engine
            .toggle_cutoff_at("officer", now + chrono::Duration::minutes(5))
            .unwrap();

        assert!(!system.cutoff_active);
        assert!(system.mandatory_rest);
        assert_eq!(
            system.cutoff_end,
            Some(now + chrono::Duration::minutes(35))
        );
    }

    #[test]
    fn permits_blocks_by_phase() {
        let now = Utc::now();
        let active = SystemStatus {
            cutoff_active: true,
            cutoff_end: None,
            mandatory_rest: false,
        };
        assert!(matches!(
            permits(&active, Role::Trainer, now),
            Err(EngineError::CutoffBlocked)
        ));
        assert!(permits(&active, Role::Supervisor, now).is_ok());

        let cooling = SystemStatus {
            cutoff_active: false,
            cutoff_end: Some(now + chrono::Duration::minutes(30)),
            mandatory_rest: true,
        };
        assert!(matches!(
            permits(&cooling, Role::Trainer, now),
            Err(EngineError::MandatoryRestBlocked)
        ));
        assert!(permits(&cooling, Role::Trainer, now + chrono::Duration::minutes(31)).is_ok());
    }

    #[test]
    fn clear_commands_is_idempotent() {
        let engine = engine();
        let now = Utc::now();
        engine
            .set_zone_at("alice", "alice", ZoneId::Red, None, now)
            .unwrap();
        engine.toggle_cutoff_at("officer", now).unwrap();

        engine.clear_commands_at("officer", now).unwrap();
        let first = engine.snapshot_at(now);
        engine.clear_commands_at("officer", now).unwrap();
        let second = engine.snapshot_at(now);

        assert_eq!(first.system, SystemStatus::default());
        assert_eq!(first.system, second.system);
        assert_eq!(worker_states(&first), worker_states(&second));
        for (_, status) in worker_states(&first) {
            assert_eq!(status, Status::Idle);
        }
        assert_eq!(engine.pending_alarms(), 0);
    }

    #[test]
    fn clear_commands_requires_authority() {
        let engine = engine();
        assert!(matches!(
            engine.clear_commands("bob"),
            Err(EngineError::Unauthorized)
        ));
    }
}
