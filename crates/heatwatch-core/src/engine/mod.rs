//! The cycle engine.
//!
//! Owns every worker's live [`CycleState`], the [`SystemStatus`], the
//! activity log and the undo ledger behind one process-wide lock, and drives
//! the alarm scheduler. All inbound operations go through here; the lock
//! makes the cutoff check-then-act atomic and serializes racing completion
//! callbacks against concurrently arriving commands.
//!
//! Transitions are `now`-parameterized: every operation has a `*_at`
//! variant taking an explicit timestamp (used by the snapshot sweep and by
//! tests), with a thin wall-clock wrapper. Timer tasks are spawned only
//! when a tokio runtime is present; without one, due completions are
//! applied lazily by [`Engine::snapshot`]'s sweep.

mod cutoff;
mod cycle;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmKind, AlarmScheduler, SYSTEM_KEY};
use crate::auth::{AuthorizationGuard, Role};
use crate::error::Result;
use crate::events::{Event, Notifier, NullNotifier};
use crate::history::{Action, ActivityLog, LogEntry};
use crate::policy::ZonePolicyTable;
use crate::state::{CycleState, Status, SystemStatus};
use crate::storage::{NullStore, StateStore};
use crate::undo::UndoLedger;

/// Engine timing knobs, normally sourced from [`crate::storage::Config`].
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Forced stand-down rest length on cutoff activation (minutes).
    pub stand_down_min: u64,
    /// Mandatory rest window after cutoff release (minutes).
    pub mandatory_rest_min: u64,
    /// Work completion to first rest reminder (seconds).
    pub reminder_initial_secs: u64,
    /// Reminder re-arm interval while rest stays pending (seconds).
    pub reminder_repeat_secs: u64,
    /// Undo stack depth per user.
    pub undo_depth: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            stand_down_min: 30,
            mandatory_rest_min: 30,
            reminder_initial_secs: 180,
            reminder_repeat_secs: 10,
            undo_depth: crate::undo::DEFAULT_UNDO_DEPTH,
        }
    }
}

impl Timings {
    pub(crate) fn stand_down(&self) -> Duration {
        Duration::minutes(self.stand_down_min as i64)
    }

    pub(crate) fn mandatory_rest(&self) -> Duration {
        Duration::minutes(self.mandatory_rest_min as i64)
    }

    pub(crate) fn reminder_initial(&self) -> Duration {
        Duration::seconds(self.reminder_initial_secs as i64)
    }

    pub(crate) fn reminder_repeat(&self) -> Duration {
        Duration::seconds(self.reminder_repeat_secs as i64)
    }
}

/// Everything needed to build an [`Engine`]. Defaults: built-in policy
/// table, open registration, null notifier and store.
pub struct EngineOptions {
    pub policies: ZonePolicyTable,
    pub guard: AuthorizationGuard,
    pub timings: Timings,
    pub notifier: Box<dyn Notifier>,
    pub store: Box<dyn StateStore>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policies: ZonePolicyTable::builtin(),
            guard: AuthorizationGuard::new(),
            timings: Timings::default(),
            notifier: Box::new(NullNotifier),
            store: Box::new(NullStore),
        }
    }
}

/// A work or rest window handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Full point-in-time copy of the engine state. Also the persistence format
/// for the write-through store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub users: HashMap<String, CycleState>,
    pub system: SystemStatus,
    pub history: ActivityLog,
    #[serde(default)]
    pub undo: UndoLedger,
}

impl EngineSnapshot {
    fn from_state(st: &CoreState) -> Self {
        Self {
            users: st.users.clone(),
            system: st.system,
            history: st.history.clone(),
            undo: st.undo.clone(),
        }
    }
}

/// Mutable engine state; every field lives under the one lock.
pub(crate) struct CoreState {
    pub(crate) users: HashMap<String, CycleState>,
    pub(crate) system: SystemStatus,
    pub(crate) history: ActivityLog,
    pub(crate) undo: UndoLedger,
    pub(crate) alarms: AlarmScheduler,
}

impl CoreState {
    fn new(undo_depth: usize) -> Self {
        Self {
            users: HashMap::new(),
            system: SystemStatus::default(),
            history: ActivityLog::new(),
            undo: UndoLedger::new(undo_depth),
            alarms: AlarmScheduler::new(),
        }
    }
}

pub(crate) struct Shared {
    pub(crate) policies: ZonePolicyTable,
    pub(crate) guard: AuthorizationGuard,
    pub(crate) timings: Timings,
    pub(crate) notifier: Box<dyn Notifier>,
    pub(crate) store: Box<dyn StateStore>,
    pub(crate) state: Mutex<CoreState>,
}

impl Shared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write-through save. The in-memory copy stays authoritative, so a
    /// failing store is logged and otherwise ignored.
    pub(crate) fn persist(&self, st: &CoreState) {
        if let Err(e) = self.store.save(&EngineSnapshot::from_state(st)) {
            tracing::warn!(error = %e, "write-through state save failed");
        }
    }

    /// Entry point for fired timer tasks. Stale generations (superseded or
    /// cancelled alarms that raced their own abort) are dropped here.
    fn fire_alarm(shared: &Arc<Shared>, key: &str, generation: u64, kind: AlarmKind) {
        let now = Utc::now();
        let mut st = shared.lock_state();
        if !st.alarms.complete(key, generation) {
            tracing::debug!(key, ?kind, "stale alarm fire ignored");
            return;
        }
        match kind {
            AlarmKind::WorkComplete => apply_work_complete(shared, &mut st, key, now),
            AlarmKind::RestComplete => apply_rest_complete(shared, &mut st, key, now),
            AlarmKind::RestReminder => apply_rest_reminder(shared, &mut st, key, now),
            AlarmKind::MandatoryRestExpiry => apply_mandatory_rest_expiry(shared, &mut st, now),
        }
        shared.persist(&st);
    }
}

/// The cycle state machine and policy enforcement engine.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    pub fn new(policies: ZonePolicyTable) -> Self {
        Self::with_options(EngineOptions {
            policies,
            ..EngineOptions::default()
        })
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                policies: options.policies,
                guard: options.guard,
                timings: options.timings,
                notifier: options.notifier,
                store: options.store,
                state: Mutex::new(CoreState::new(options.timings.undo_depth)),
            }),
        }
    }

    /// Rebuild an engine from a persisted snapshot (process restart).
    /// Pending alarms are not restored; the first sweep catches up.
    pub fn restore(options: EngineOptions, snapshot: EngineSnapshot) -> Self {
        let engine = Self::with_options(options);
        {
            let mut st = engine.shared.lock_state();
            st.users = snapshot.users;
            st.system = snapshot.system;
            st.history = snapshot.history;
            st.undo = snapshot.undo;
        }
        engine
    }

    pub fn policies(&self) -> &ZonePolicyTable {
        &self.shared.policies
    }

    /// Create (or overwrite) a user's cycle state, optionally tagged with a
    /// work-crew group. Authority roles must pass the deployment's
    /// credential check.
    pub fn register(
        &self,
        username: &str,
        role: Role,
        group: Option<&str>,
        secret: Option<&str>,
    ) -> Result<()> {
        if !self.shared.guard.verify_registration(username, role, secret) {
            return Err(crate::error::EngineError::Unauthorized);
        }
        let mut state = CycleState::new(role);
        state.group = group.map(str::to_string);
        let mut st = self.shared.lock_state();
        st.users.insert(username.to_string(), state);
        self.shared.persist(&st);
        Ok(())
    }

    /// Snapshot at the current wall clock; applies any due completions
    /// first (the lazy sweep for deployments without push notifications).
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> EngineSnapshot {
        let mut st = self.shared.lock_state();
        if sweep(&self.shared, &mut st, now) {
            self.shared.persist(&st);
        }
        EngineSnapshot::from_state(&st)
    }

    /// Authority-only: clear the activity log, leaving one entry that
    /// records the reset itself.
    pub fn reset_log(&self, actor: &str) -> Result<()> {
        self.reset_log_at(actor, Utc::now())
    }

    pub fn reset_log_at(&self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        let shared = &self.shared;
        let mut st = shared.lock_state();
        let role = role_of(&st, actor).ok_or(crate::error::EngineError::Unauthorized)?;
        if !shared.guard.can_reset(role) {
            return Err(crate::error::EngineError::Unauthorized);
        }
        let entry = st.history.reset(now, actor);
        shared.notifier.notify(&Event::HistoryAppended { entry });
        shared.persist(&st);
        Ok(())
    }

    /// Number of pending deferred callbacks (diagnostics).
    pub fn pending_alarms(&self) -> usize {
        self.shared.lock_state().alarms.pending_count()
    }

    /// The kind of alarm pending for a user, if any (diagnostics).
    pub fn pending_alarm_kind(&self, key: &str) -> Option<AlarmKind> {
        self.shared.lock_state().alarms.pending_kind(key)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

pub(crate) fn role_of(st: &CoreState, username: &str) -> Option<Role> {
    st.users.get(username).map(|u| u.role)
}

/// Append to the activity log, notify, and write through.
pub(crate) fn push_log(shared: &Shared, history: &mut ActivityLog, entry: LogEntry) {
    history.append(entry.clone());
    if let Err(e) = shared.store.append_entry(&entry) {
        tracing::warn!(error = %e, "write-through log append failed");
    }
    shared.notifier.notify(&Event::HistoryAppended { entry });
}

/// Arm (supersede) a deferred callback for `key` at `fire_at`.
///
/// Without a tokio runtime this only records the pending entry; the sweep
/// applies the transition when it becomes due.
pub(crate) fn arm(
    shared: &Arc<Shared>,
    st: &mut CoreState,
    key: &str,
    kind: AlarmKind,
    fire_at: DateTime<Utc>,
) {
    let generation = st.alarms.begin(key, kind);
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!(key, ?kind, "no async runtime; completion deferred to sweep");
        return;
    };
    let weak = Arc::downgrade(shared);
    let task_key = key.to_string();
    let handle = runtime.spawn(async move {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(delay).await;
        if let Some(shared) = weak.upgrade() {
            Shared::fire_alarm(&shared, &task_key, generation, kind);
        }
    });
    st.alarms.attach(key, generation, handle);
}

/// Work window elapsed. Completion is advisory: the worker stays `Working`
/// with `pending_rest` set, and the reminder chain starts.
pub(crate) fn apply_work_complete(
    shared: &Arc<Shared>,
    st: &mut CoreState,
    username: &str,
    now: DateTime<Utc>,
) {
    let Some(user) = st.users.get_mut(username) else {
        tracing::debug!(username, "work-complete fired for unknown user");
        return;
    };
    if user.status != Status::Working || user.work_completed {
        return;
    }
    user.work_completed = true;
    user.pending_rest = true;
    let zone = user.zone;
    push_log(
        shared,
        &mut st.history,
        LogEntry::new(
            now,
            Some(username),
            Action::CompletedWork,
            zone,
            "work window elapsed; rest pending",
        ),
    );
    shared.notifier.notify(&Event::WorkComplete {
        username: username.to_string(),
        zone,
        at: now,
    });
    arm(
        shared,
        st,
        username,
        AlarmKind::RestReminder,
        now + shared.timings.reminder_initial(),
    );
}

/// Rest window elapsed: the worker returns to idle.
pub(crate) fn apply_rest_complete(
    shared: &Arc<Shared>,
    st: &mut CoreState,
    username: &str,
    now: DateTime<Utc>,
) {
    let Some(user) = st.users.get_mut(username) else {
        tracing::debug!(username, "rest-complete fired for unknown user");
        return;
    };
    if user.status != Status::Resting {
        return;
    }
    let zone = user.zone;
    user.clear_cycle();
    let status = user.status;
    push_log(
        shared,
        &mut st.history,
        LogEntry::new(
            now,
            Some(username),
            Action::CompletedRest,
            zone,
            "rest window elapsed",
        ),
    );
    shared.notifier.notify(&Event::StatusChanged {
        username: username.to_string(),
        status,
        zone: None,
        at: now,
    });
}

/// Escalating reminder: re-arms itself while rest stays pending; any state
/// change away from awaiting-rest breaks the chain.
pub(crate) fn apply_rest_reminder(
    shared: &Arc<Shared>,
    st: &mut CoreState,
    username: &str,
    now: DateTime<Utc>,
) {
    let Some(user) = st.users.get(username) else {
        tracing::debug!(username, "rest reminder fired for unknown user");
        return;
    };
    if !user.is_awaiting_rest() {
        tracing::debug!(username, "rest reminder chain stopped");
        return;
    }
    let overdue_secs = user
        .end
        .map(|end| (now - end).num_seconds().max(0))
        .unwrap_or(0);
    shared.notifier.notify(&Event::RestReminder {
        username: username.to_string(),
        overdue_secs,
        at: now,
    });
    arm(
        shared,
        st,
        username,
        AlarmKind::RestReminder,
        now + shared.timings.reminder_repeat(),
    );
}

/// Post-cutoff mandatory rest window expired.
pub(crate) fn apply_mandatory_rest_expiry(
    shared: &Arc<Shared>,
    st: &mut CoreState,
    now: DateTime<Utc>,
) {
    if !st.system.mandatory_rest {
        return;
    }
    st.system.mandatory_rest = false;
    st.system.cutoff_end = None;
    shared.notifier.notify(&Event::SystemStatusChanged {
        system: st.system,
        at: now,
    });
}

/// Apply every transition that has come due by `now`. Returns whether
/// anything changed.
pub(crate) fn sweep(shared: &Arc<Shared>, st: &mut CoreState, now: DateTime<Utc>) -> bool {
    let mut changed = false;

    if st.system.mandatory_rest && st.system.cutoff_end.is_some_and(|end| end <= now) {
        st.alarms.cancel(SYSTEM_KEY);
        apply_mandatory_rest_expiry(shared, st, now);
        changed = true;
    }

    let due_work: Vec<String> = st
        .users
        .iter()
        .filter(|(_, u)| {
            u.status == Status::Working && !u.work_completed && u.end.is_some_and(|end| end <= now)
        })
        .map(|(name, _)| name.clone())
        .collect();
    for name in due_work {
        st.alarms.cancel(&name);
        apply_work_complete(shared, st, &name, now);
        changed = true;
    }

    let due_rest: Vec<String> = st
        .users
        .iter()
        .filter(|(_, u)| u.status == Status::Resting && u.end.is_some_and(|end| end <= now))
        .map(|(name, _)| name.clone())
        .collect();
    for name in due_rest {
        st.alarms.cancel(&name);
        apply_rest_complete(shared, st, &name, now);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, SharedSecret};

    #[test]
    fn register_creates_role_appropriate_state() {
        let engine = Engine::new(ZonePolicyTable::builtin());
        engine.register("alice", Role::Trainer, None, None).unwrap();
        engine.register("officer", Role::SafetyOfficer, None, None).unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.users["alice"].status, Status::Idle);
        assert_eq!(snap.users["officer"].status, Status::Monitoring);
    }

    #[test]
    fn register_overwrites_existing_state() {
        let engine = Engine::new(ZonePolicyTable::builtin());
        engine.register("alice", Role::Trainer, None, None).unwrap();
        engine
            .set_zone("alice", "alice", crate::policy::ZoneId::Yellow, None)
            .unwrap();
        engine.register("alice", Role::Trainer, None, None).unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.users["alice"].status, Status::Idle);
        assert!(snap.users["alice"].zone.is_none());
    }

    #[test]
    fn register_carries_group_label() {
        let engine = Engine::new(ZonePolicyTable::builtin());
        engine
            .register("alice", Role::Trainer, Some("north-crew"), None)
            .unwrap();
        engine
            .set_zone("alice", "alice", crate::policy::ZoneId::Yellow, None)
            .unwrap();
        engine.complete_early("alice").unwrap();

        // The label outlives the cycle it was registered with.
        let snap = engine.snapshot();
        assert_eq!(snap.users["alice"].group.as_deref(), Some("north-crew"));
    }

    #[test]
    fn credential_check_gates_authority_registration() {
        let engine = Engine::with_options(EngineOptions {
            guard: AuthorizationGuard::with_credential_check(Box::new(SharedSecret::new("s3cret"))),
            ..EngineOptions::default()
        });
        assert!(engine.register("officer", Role::SafetyOfficer, None, None).is_err());
        assert!(engine
            .register("officer", Role::SafetyOfficer, None, Some("s3cret"))
            .is_ok());
        // Subordinates register freely.
        assert!(engine.register("alice", Role::Trainer, None, None).is_ok());
    }

    #[test]
    fn reset_log_requires_authority() {
        let engine = Engine::new(ZonePolicyTable::builtin());
        engine.register("alice", Role::Trainer, None, None).unwrap();
        engine.register("officer", Role::Supervisor, None, None).unwrap();

        assert!(matches!(
            engine.reset_log("alice"),
            Err(crate::error::EngineError::Unauthorized)
        ));
        engine.reset_log("officer").unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history.all()[0].action, Action::Reset);
    }
}
