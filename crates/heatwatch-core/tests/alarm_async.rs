//! Timer-driven behavior under tokio's paused clock: completion callbacks,
//! alarm supersession, and the rest-reminder escalation chain.

use std::sync::Mutex;
use std::time::Duration;

use heatwatch_core::{
    AlarmKind, Engine, EngineOptions, Event, Notifier, Role, Status, Timings, ZoneId,
};

/// Captures every event for later assertions.
#[derive(Default)]
struct Capture {
    events: Mutex<Vec<Event>>,
}

impl Notifier for Capture {
    fn notify(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

fn reminder_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::RestReminder { .. }))
        .count()
}

fn engine_with_capture(timings: Timings) -> (Engine, std::sync::Arc<Capture>) {
    let capture = std::sync::Arc::new(Capture::default());
    struct Forward(std::sync::Arc<Capture>);
    impl Notifier for Forward {
        fn notify(&self, event: &Event) {
            self.0.notify(event);
        }
    }
    let engine = Engine::with_options(EngineOptions {
        timings,
        notifier: Box::new(Forward(capture.clone())),
        ..EngineOptions::default()
    });
    engine.register("alice", Role::Trainer, None, None).unwrap();
    (engine, capture)
}

#[tokio::test(start_paused = true)]
async fn work_complete_callback_fires_and_arms_reminder() {
    let (engine, capture) = engine_with_capture(Timings::default());

    // Test zone: one-minute work window.
    engine
        .set_zone("alice", "alice", ZoneId::Test, None)
        .unwrap();
    assert_eq!(engine.pending_alarm_kind("alice"), Some(AlarmKind::WorkComplete));

    tokio::time::sleep(Duration::from_secs(61)).await;

    let events = capture.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::WorkComplete { username, .. } if username == "alice")));
    drop(events);
    // The worker stays in the work phase; the reminder chain is armed.
    assert_eq!(engine.pending_alarm_kind("alice"), Some(AlarmKind::RestReminder));
    let snap = engine.snapshot();
    assert_eq!(snap.users["alice"].status, Status::Working);
    assert!(snap.users["alice"].pending_rest);
}

#[tokio::test(start_paused = true)]
async fn reassignment_supersedes_pending_alarm() {
    let (engine, _capture) = engine_with_capture(Timings::default());

    engine
        .set_zone("alice", "alice", ZoneId::Test, None)
        .unwrap();
    engine
        .set_zone("alice", "alice", ZoneId::Black, None)
        .unwrap();
    assert_eq!(engine.pending_alarms(), 1);

    tokio::time::sleep(Duration::from_secs(16 * 60)).await;

    // Both windows are past due, but only the surviving alarm fired.
    let snap = engine.snapshot();
    let completions = snap
        .history
        .all()
        .iter()
        .filter(|e| e.action == heatwatch_core::Action::CompletedWork)
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test(start_paused = true)]
async fn early_completion_cancels_the_alarm() {
    let (engine, capture) = engine_with_capture(Timings::default());

    engine
        .set_zone("alice", "alice", ZoneId::Test, None)
        .unwrap();
    engine.complete_early("alice").unwrap();
    assert_eq!(engine.pending_alarms(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;

    let events = capture.events.lock().unwrap();
    assert!(!events.iter().any(|e| matches!(e, Event::WorkComplete { .. })));
}

#[tokio::test(start_paused = true)]
async fn reminder_chain_escalates_then_stops_on_rest() {
    let timings = Timings {
        reminder_initial_secs: 5,
        reminder_repeat_secs: 2,
        ..Timings::default()
    };
    let (engine, capture) = engine_with_capture(timings);

    engine
        .set_zone("alice", "alice", ZoneId::Test, None)
        .unwrap();
    // Past the work window plus the initial delay and two repeats.
    tokio::time::sleep(Duration::from_secs(60 + 5 + 2 * 2 + 1)).await;

    let fired = reminder_count(&capture.events.lock().unwrap());
    assert!(fired >= 3, "expected an escalating chain, got {fired}");

    // Starting rest breaks the chain: no further reminders.
    engine.start_rest("alice").unwrap();
    let before = reminder_count(&capture.events.lock().unwrap());
    tokio::time::sleep(Duration::from_secs(20)).await;
    let after = reminder_count(&capture.events.lock().unwrap());
    assert_eq!(before, after);
}

#[tokio::test(start_paused = true)]
async fn rest_complete_callback_returns_worker_to_idle() {
    let (engine, capture) = engine_with_capture(Timings::default());

    engine
        .set_zone("alice", "alice", ZoneId::Test, None)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;
    // Test zone rest is a fixed 30 seconds.
    engine.start_rest("alice").unwrap();
    tokio::time::sleep(Duration::from_secs(31)).await;

    let events = capture.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::StatusChanged { username, status: Status::Idle, .. } if username == "alice"
    )));
    drop(events);
    assert_eq!(engine.pending_alarms(), 0);
    let snap = engine.snapshot();
    assert_eq!(snap.users["alice"].status, Status::Idle);
    assert!(snap.users["alice"].zone.is_none());
}
