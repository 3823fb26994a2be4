use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{CycleSnapshot, Phase};

/// Every state change of a focus cycle produces an Event.
/// The host surface renders them; nothing in the cycle depends on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CycleStarted {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CyclePaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CycleReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        phase: Phase,
        remaining_secs: u64,
    },
    PhaseCompleted {
        from: Phase,
        to: Phase,
        completed_focus_count: u32,
        skipped: bool,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Persisting a completed focus phase failed. The cycle has already
    /// moved on; this is advisory only.
    SessionRecordFailed {
        duration_secs: u64,
        error: String,
        at: DateTime<Utc>,
    },
    StateSnapshot(CycleSnapshot),
}
