//! # StuddyHub Core Library
//!
//! Focus-timer logic for the StuddyHub study companion. The CLI is a thin
//! host over this crate.
//!
//! ## Architecture
//!
//! - **Focus cycle**: a synchronous state machine ([`FocusCycle`]) that
//!   counts down one second per `tick()` and moves between focus, short
//!   break and long break phases
//! - **Controller**: [`FocusController`] owns a cycle on a tokio task and
//!   drives it from a one-second interval
//! - **Recorders**: persist each completed focus phase, locally (SQLite)
//!   or to a hosted REST data store
//! - **Notifiers**: best-effort phase-change alerts (terminal, webhook)
//! - **Storage**: SQLite session history and TOML configuration

pub mod cycle;
pub mod error;
pub mod events;
pub mod notify;
pub mod recorder;
pub mod storage;

pub use cycle::{
    Collaborators, ControllerOptions, CycleDurations, CycleSnapshot, FocusController, FocusCycle,
    Phase, Transition,
};
pub use error::{
    ConfigError, CoreError, DatabaseError, NotifyError, RecorderError, ValidationError,
};
pub use events::Event;
pub use notify::{MultiNotifier, Notifier, PhaseNotification, TerminalNotifier, WebhookNotifier};
pub use recorder::{
    LocalRecorder, NewStudySession, NullRecorder, RemoteRecorder, RemoteRecorderConfig,
    SessionDefaults, SessionRecorder, StudySessionRecord,
};
pub use storage::{BackendKind, Config, Database, Stats};
