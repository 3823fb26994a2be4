//! Focus cycle state machine.
//!
//! `FocusCycle` owns the countdown and phase bookkeeping. It has no clock of
//! its own: the caller invokes `tick()` once per elapsed second while the
//! cycle is running. A completed phase is reported as a [`Transition`] that
//! lists the side effects (session write, notification) the caller should
//! dispatch.
//!
//! ## State Transitions
//!
//! ```text
//! Focus --(n-th focus, n % 4 != 0)--> ShortBreak --> Focus
//! Focus --(n-th focus, n % 4 == 0)--> LongBreak  --> Focus
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::phase::{CycleDurations, Phase};
use crate::events::Event;
use crate::notify::PhaseNotification;
use crate::recorder::{NewStudySession, SessionDefaults};

/// Result of a completed phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub completed_focus_count: u32,
    /// Completed by `skip()` rather than by the countdown.
    pub skipped: bool,
    /// Present only when a focus phase ended.
    pub session: Option<NewStudySession>,
    pub notification: PhaseNotification,
}

impl Transition {
    pub fn event(&self) -> Event {
        Event::PhaseCompleted {
            from: self.from,
            to: self.to,
            completed_focus_count: self.completed_focus_count,
            skipped: self.skipped,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub running: bool,
    pub completed_focus_count: u32,
    /// 0.0 .. 1.0 progress within the current phase.
    pub progress: f64,
}

#[derive(Debug, Clone)]
pub struct FocusCycle {
    durations: CycleDurations,
    session_defaults: SessionDefaults,
    phase: Phase,
    remaining_secs: u64,
    running: bool,
    completed_focus_count: u32,
}

impl FocusCycle {
    /// Starts paused in the focus phase with the full focus duration.
    pub fn new(durations: CycleDurations) -> Self {
        Self {
            durations,
            session_defaults: SessionDefaults::default(),
            phase: Phase::Focus,
            remaining_secs: durations.focus_secs,
            running: false,
            completed_focus_count: 0,
        }
    }

    pub fn with_session_defaults(mut self, defaults: SessionDefaults) -> Self {
        self.session_defaults = defaults;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn total_secs(&self) -> u64 {
        self.durations.duration_of(self.phase)
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        let total = self.total_secs();
        let progress = if total == 0 {
            0.0
        } else {
            1.0 - (self.remaining_secs as f64 / total as f64)
        };
        CycleSnapshot {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: total,
            running: self.running,
            completed_focus_count: self.completed_focus_count,
            progress,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(Event::CycleStarted {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Event::CyclePaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Stop and restore the full duration of the current phase.
    pub fn reset(&mut self) -> Event {
        self.reset_to(self.total_secs())
    }

    /// Stop and set the countdown, clamped to the current phase duration.
    pub fn reset_to(&mut self, secs: u64) -> Event {
        self.running = false;
        self.remaining_secs = secs.min(self.total_secs());
        Event::CycleReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Does nothing while paused. Reaching zero completes the phase in the
    /// same call.
    pub fn tick(&mut self) -> Option<Transition> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return Some(self.complete_phase(false));
        }
        None
    }

    /// Complete the current phase now, whatever is left on the clock.
    pub fn skip(&mut self) -> Transition {
        self.complete_phase(true)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self, skipped: bool) -> Transition {
        let from = self.phase;
        let session = if from == Phase::Focus {
            self.completed_focus_count = self.completed_focus_count.saturating_add(1);
            Some(NewStudySession::completed_focus(
                self.durations.focus_secs,
                self.session_defaults,
            ))
        } else {
            None
        };

        let to = self.durations.next_phase(from, self.completed_focus_count);
        let notification = PhaseNotification::for_transition(
            from,
            to,
            self.completed_focus_count,
            &self.durations,
        );

        self.phase = to;
        self.reset();

        Transition {
            from,
            to,
            completed_focus_count: self.completed_focus_count,
            skipped,
            session,
            notification,
        }
    }
}
