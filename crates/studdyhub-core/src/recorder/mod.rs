//! Session recorders persist one row per completed focus phase.
//!
//! The cycle controller calls [`SessionRecorder::record_focus_session`]
//! from a detached task. A single attempt is made; failures are reported
//! as events and never fed back into the cycle.

mod local;
mod remote;

pub use local::LocalRecorder;
pub use remote::{RemoteRecorder, RemoteRecorderConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, ValidationError};

/// Fixed per-session values written alongside the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    /// Self-reported focus, 1 (scattered) to 5 (deep).
    pub focus_level: u8,
    pub distractions: u32,
    pub goal_achieved: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            focus_level: 4,
            distractions: 0,
            goal_achieved: false,
        }
    }
}

impl SessionDefaults {
    /// # Errors
    /// Returns an error when `focus_level` is outside 1..=5.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=5).contains(&self.focus_level) {
            return Err(ValidationError::InvalidValue {
                field: "focus_level".into(),
                message: format!("{} is outside 1..=5", self.focus_level),
            });
        }
        Ok(())
    }
}

/// Row to insert for a completed focus phase. `created_at` is left to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudySession {
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub focus_level: u8,
    pub distractions: u32,
    pub goal_achieved: bool,
}

impl NewStudySession {
    pub fn completed_focus(duration_secs: u64, defaults: SessionDefaults) -> Self {
        Self {
            duration_secs,
            focus_level: defaults.focus_level,
            distractions: defaults.distractions,
            goal_achieved: defaults.goal_achieved,
        }
    }
}

/// A session row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySessionRecord {
    pub id: String,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub focus_level: u8,
    pub distractions: u32,
    pub goal_achieved: bool,
    pub created_at: DateTime<Utc>,
}

/// Persists completed focus phases.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn record_focus_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, RecorderError>;
}

/// Recorder for runs where nothing should be persisted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl SessionRecorder for NullRecorder {
    fn name(&self) -> &str {
        "none"
    }

    async fn record_focus_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, RecorderError> {
        Ok(StudySessionRecord {
            id: String::new(),
            duration_secs: session.duration_secs,
            focus_level: session.focus_level,
            distractions: session.distractions,
            goal_achieved: session.goal_achieved,
            created_at: Utc::now(),
        })
    }
}
