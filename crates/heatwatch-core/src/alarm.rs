//! Cancellable, supersedable deferred callbacks.
//!
//! At most one alarm is pending per key: re-arming a key supersedes any
//! prior alarm. Cancellation is best-effort -- a spawned timer task may
//! already be past its sleep when it is aborted, so every fire re-checks
//! the generation recorded here (under the engine lock) before acting.
//! A stale generation means the alarm lost a race and the fire is a no-op.
//!
//! The registry itself holds no timer machinery; the engine spawns tokio
//! tasks and attaches their handles. Deployments without an async runtime
//! never attach handles and rely on the snapshot sweep instead.

use std::collections::HashMap;

use tokio::task::JoinHandle;

/// Alarm key reserved for system-wide callbacks (mandatory-rest expiry).
pub const SYSTEM_KEY: &str = "@system";

/// Which transition the alarm drives when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// Work window elapsed: mark work complete, start the reminder chain.
    WorkComplete,
    /// Rest window elapsed: return the worker to idle.
    RestComplete,
    /// Rest still pending: notify and re-arm.
    RestReminder,
    /// Post-cutoff mandatory rest window expired.
    MandatoryRestExpiry,
}

#[derive(Debug)]
struct Alarm {
    generation: u64,
    kind: AlarmKind,
    handle: Option<JoinHandle<()>>,
}

/// Keyed registry of pending alarms with generation counters.
#[derive(Debug, Default)]
pub struct AlarmScheduler {
    pending: HashMap<String, Alarm>,
    next_generation: u64,
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending alarm for `key`, superseding any prior one.
    /// Returns the generation the eventual fire must present.
    pub fn begin(&mut self, key: &str, kind: AlarmKind) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let prev = self.pending.insert(
            key.to_string(),
            Alarm {
                generation,
                kind,
                handle: None,
            },
        );
        if let Some(Alarm {
            handle: Some(handle),
            ..
        }) = prev
        {
            handle.abort();
        }
        generation
    }

    /// Attach the spawned task's handle, if the alarm was not superseded
    /// between `begin` and the spawn.
    pub fn attach(&mut self, key: &str, generation: u64, handle: JoinHandle<()>) {
        match self.pending.get_mut(key) {
            Some(alarm) if alarm.generation == generation => alarm.handle = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Remove a pending alarm if present; a no-op otherwise.
    pub fn cancel(&mut self, key: &str) {
        if let Some(alarm) = self.pending.remove(key) {
            if let Some(handle) = alarm.handle {
                handle.abort();
            }
        }
    }

    /// Whether `generation` still identifies the pending alarm for `key`.
    pub fn is_current(&self, key: &str, generation: u64) -> bool {
        self.pending
            .get(key)
            .is_some_and(|a| a.generation == generation)
    }

    /// Consume a fired alarm: removes it if the generation is still current
    /// and returns whether the fire should act.
    pub fn complete(&mut self, key: &str, generation: u64) -> bool {
        if self.is_current(key, generation) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }

    pub fn pending_kind(&self, key: &str) -> Option<AlarmKind> {
        self.pending.get(key).map(|a| a.kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Abort everything (engine clear / teardown).
    pub fn clear(&mut self) {
        for (_, alarm) in self.pending.drain() {
            if let Some(handle) = alarm.handle {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_supersedes_prior_generation() {
        let mut alarms = AlarmScheduler::new();
        let g1 = alarms.begin("alice", AlarmKind::WorkComplete);
        let g2 = alarms.begin("alice", AlarmKind::WorkComplete);
        assert_ne!(g1, g2);
        assert_eq!(alarms.pending_count(), 1);
        assert!(!alarms.is_current("alice", g1));
        assert!(alarms.is_current("alice", g2));
    }

    #[test]
    fn stale_fire_does_not_act() {
        let mut alarms = AlarmScheduler::new();
        let g1 = alarms.begin("alice", AlarmKind::WorkComplete);
        let g2 = alarms.begin("alice", AlarmKind::RestComplete);
        assert!(!alarms.complete("alice", g1));
        // The superseding alarm is untouched by the stale fire.
        assert!(alarms.is_current("alice", g2));
        assert!(alarms.complete("alice", g2));
        assert_eq!(alarms.pending_count(), 0);
    }

    #[test]
    fn cancel_is_noop_when_absent() {
        let mut alarms = AlarmScheduler::new();
        alarms.cancel("nobody");
        let g = alarms.begin("alice", AlarmKind::RestComplete);
        alarms.cancel("alice");
        assert!(!alarms.is_current("alice", g));
        assert_eq!(alarms.pending_count(), 0);
    }

    #[test]
    fn keys_are_independent() {
        let mut alarms = AlarmScheduler::new();
        let ga = alarms.begin("alice", AlarmKind::WorkComplete);
        let gb = alarms.begin("bob", AlarmKind::RestComplete);
        assert_eq!(alarms.pending_count(), 2);
        alarms.cancel("alice");
        assert!(!alarms.is_current("alice", ga));
        assert!(alarms.is_current("bob", gb));
        assert_eq!(alarms.pending_kind("bob"), Some(AlarmKind::RestComplete));
    }
}
