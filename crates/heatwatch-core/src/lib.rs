//! # Heatwatch Core Library
//!
//! Core business logic for Heatwatch, a WBGT heat-stress work/rest cycle
//! tracker. All operations are available through this library; the CLI
//! binary (and any service front end) is a thin layer over it.
//!
//! ## Architecture
//!
//! - **Engine**: per-worker cycle state machine plus the organization-wide
//!   cutoff controller, behind one process-wide lock
//! - **Policy**: immutable zone table mapping each WBGT tier to work/rest
//!   durations
//! - **Alarms**: cancellable, supersedable deferred callbacks driving
//!   work/rest completion and rest-reminder escalation
//! - **Storage**: TOML configuration and a write-through JSON snapshot store
//!
//! ## Key Components
//!
//! - [`Engine`]: the cycle state machine and policy enforcement engine
//! - [`ZonePolicyTable`]: zone -> work/rest durations
//! - [`AuthorizationGuard`]: capability checks with a pluggable credential
//!   gate for authority registration
//! - [`ActivityLog`]: append-only audit record of every transition

pub mod alarm;
pub mod auth;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod policy;
pub mod state;
pub mod storage;
pub mod undo;

pub use alarm::{AlarmKind, SYSTEM_KEY};
pub use auth::{AllowAll, AuthorizationGuard, CredentialCheck, Role, SharedSecret};
pub use engine::{CycleWindow, Engine, EngineOptions, EngineSnapshot, Timings};
pub use error::{ConfigError, EngineError, Result, StoreError};
pub use events::{Event, Notifier, NullNotifier};
pub use history::{Action, ActivityLog, LogEntry};
pub use policy::{ZoneId, ZonePolicy, ZonePolicyTable};
pub use state::{Coordinates, CycleState, Status, SystemStatus};
pub use storage::{Config, JsonFileStore, NullStore, StateStore};
pub use undo::UndoLedger;
