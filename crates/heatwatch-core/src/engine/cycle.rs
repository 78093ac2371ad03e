//! Per-worker cycle transitions.
//!
//! `idle -> working -> resting -> idle`, with the shorten-only rule on
//! reassignment: a new zone may shrink a running work window, never extend
//! it. Every mutating call pushes the prior state onto the undo ledger
//! first, so undo always restores the immediately preceding state.

use chrono::{DateTime, Duration, Utc};

use crate::alarm::AlarmKind;
use crate::engine::{arm, push_log, role_of, CoreState, CycleWindow, Engine};
use crate::error::{EngineError, Result};
use crate::events::Event;
use crate::history::{Action, LogEntry};
use crate::policy::ZoneId;
use crate::state::{Coordinates, Status};

/// Fixed diagnostic rest length for the reserved `test` zone; bypasses the
/// production policy table.
const TEST_REST_SECS: i64 = 30;

impl Engine {
    /// Assign `target` to a zone and open a work window.
    ///
    /// Requires the actor to be allowed to act on the target, the zone to be
    /// assignable, and the cutoff controller to permit the action. For a
    /// target already working, the new end is clamped to
    /// `min(current end, now + work)` -- windows only ever shrink.
    pub fn set_zone(
        &self,
        actor: &str,
        target: &str,
        zone: ZoneId,
        location: Option<Coordinates>,
    ) -> Result<CycleWindow> {
        self.set_zone_at(actor, target, zone, location, Utc::now())
    }

    pub fn set_zone_at(
        &self,
        actor: &str,
        target: &str,
        zone: ZoneId,
        location: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Result<CycleWindow> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let actor_role = role_of(&st, actor).ok_or(EngineError::Unauthorized)?;
        if !shared.guard.can_act(actor_role, actor, target) {
            return Err(EngineError::Unauthorized);
        }
        let policy = shared.policies.require(zone)?;
        if zone.is_privileged() && !actor_role.is_authority() {
            return Err(EngineError::Unauthorized);
        }
        super::cutoff::permits(&st.system, actor_role, now)?;

        let work = policy.work_duration();
        let Some(user) = st.users.get_mut(target) else {
            return Err(EngineError::NotFound(target.to_string()));
        };
        let prior = user.clone();

        let mut end = now + work;
        if prior.status == Status::Working {
            if let Some(current_end) = prior.end {
                end = end.min(current_end);
            }
        }
        // An already-lapsed window clamps below `now`; the end >= start
        // invariant wins and the next sweep completes the zero-length window.
        if end < now {
            end = now;
        }

        user.status = Status::Working;
        user.zone = Some(zone);
        user.start = Some(now);
        user.end = Some(end);
        user.location = location;
        user.work_completed = false;
        user.pending_rest = false;

        st.undo.push(target, prior);
        push_log(
            &shared,
            &mut st.history,
            LogEntry::new(
                now,
                Some(target),
                Action::SetZone,
                Some(zone),
                format!("zone {zone} assigned by {actor}"),
            ),
        );
        shared.notifier.notify(&Event::StatusChanged {
            username: target.to_string(),
            status: Status::Working,
            zone: Some(zone),
            at: now,
        });
        arm(&shared, &mut st, target, AlarmKind::WorkComplete, end);
        shared.persist(&st);

        Ok(CycleWindow { start: now, end })
    }

    /// Begin the mandated rest for the actor's current zone.
    pub fn start_rest(&self, actor: &str) -> Result<CycleWindow> {
        self.start_rest_at(actor, Utc::now())
    }

    pub fn start_rest_at(&self, actor: &str, now: DateTime<Utc>) -> Result<CycleWindow> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let Some(user) = st.users.get_mut(actor) else {
            return Err(EngineError::NotFound(actor.to_string()));
        };
        let Some(zone) = user.zone else {
            return Err(EngineError::InvalidState(
                "no active zone to rest from".to_string(),
            ));
        };
        let rest = if zone == ZoneId::Test {
            Duration::seconds(TEST_REST_SECS)
        } else {
            shared.policies.require(zone)?.rest_duration()
        };
        let prior = user.clone();
        let end = now + rest;

        user.status = Status::Resting;
        user.start = Some(now);
        user.end = Some(end);
        user.work_completed = false;
        user.pending_rest = false;

        st.undo.push(actor, prior);
        push_log(
            &shared,
            &mut st.history,
            LogEntry::new(
                now,
                Some(actor),
                Action::StartRest,
                Some(zone),
                format!("resting for {} until {}", zone, end.format("%H:%M:%S")),
            ),
        );
        shared.notifier.notify(&Event::StatusChanged {
            username: actor.to_string(),
            status: Status::Resting,
            zone: Some(zone),
            at: now,
        });
        arm(&shared, &mut st, actor, AlarmKind::RestComplete, end);
        shared.persist(&st);

        Ok(CycleWindow { start: now, end })
    }

    /// Cut the current work or rest window short and return to idle.
    ///
    /// Blocked while the worker is resting under a cutoff-imposed window.
    pub fn complete_early(&self, actor: &str) -> Result<()> {
        self.complete_early_at(actor, Utc::now())
    }

    pub fn complete_early_at(&self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let CoreState {
            users,
            system,
            undo,
            alarms,
            history,
        } = &mut *st;
        let Some(user) = users.get_mut(actor) else {
            return Err(EngineError::NotFound(actor.to_string()));
        };
        let under_cutoff_rest = user.status == Status::Resting
            && user.zone == Some(ZoneId::Cutoff)
            && (system.cutoff_active || system.mandatory_rest_holds(now));
        if under_cutoff_rest {
            return Err(EngineError::MandatoryRestBlocked);
        }

        let prior = user.clone();
        let zone = user.zone;
        user.clear_cycle();
        let status = user.status;

        undo.push(actor, prior);
        alarms.cancel(actor);
        push_log(
            &shared,
            history,
            LogEntry::new(
                now,
                Some(actor),
                Action::EarlyCompletion,
                zone,
                "cycle completed early",
            ),
        );
        shared.notifier.notify(&Event::StatusChanged {
            username: actor.to_string(),
            status,
            zone: None,
            at: now,
        });
        shared.persist(&st);
        Ok(())
    }

    /// Revert the actor's last recorded mutation (erroneous zone
    /// assignment, accidental rest, ...). Restores the popped snapshot as
    /// the current state and re-arms its completion alarm if one applies.
    ///
    /// Gated by the cutoff controller for non-authority users: a forced
    /// stand-down pushes the pre-cutoff state onto the ledger, and restoring
    /// it mid-cutoff would put the worker back to work. The snapshot stays
    /// on the stack, so the undo is available again once the window lifts.
    pub fn undo(&self, actor: &str) -> Result<()> {
        self.undo_at(actor, Utc::now())
    }

    pub fn undo_at(&self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        let shared = self.shared().clone();
        let mut st = shared.lock_state();

        let role = role_of(&st, actor).ok_or_else(|| EngineError::NotFound(actor.to_string()))?;
        super::cutoff::permits(&st.system, role, now)?;
        let snapshot = st.undo.pop(actor).ok_or(EngineError::NoUndoAvailable)?;
        let status = snapshot.status;
        let zone = snapshot.zone;
        let end = snapshot.end;
        let work_completed = snapshot.work_completed;

        st.alarms.cancel(actor);
        st.users.insert(actor.to_string(), snapshot);
        if let Some(end) = end {
            match status {
                Status::Working if !work_completed => {
                    arm(&shared, &mut st, actor, AlarmKind::WorkComplete, end)
                }
                Status::Resting => arm(&shared, &mut st, actor, AlarmKind::RestComplete, end),
                _ => {}
            }
        }
        shared.notifier.notify(&Event::StatusChanged {
            username: actor.to_string(),
            status,
            zone,
            at: now,
        });
        shared.persist(&st);
        Ok(())
    }
}
