use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Phase lengths in seconds plus the long-break interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDurations {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Every n-th completed focus phase is followed by a long break.
    pub focus_phases_before_long_break: u32,
}

impl Default for CycleDurations {
    fn default() -> Self {
        Self {
            focus_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            focus_phases_before_long_break: 4,
        }
    }
}

impl CycleDurations {
    pub fn duration_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_secs,
            Phase::ShortBreak => self.short_break_secs,
            Phase::LongBreak => self.long_break_secs,
        }
    }

    /// Zero-length phases would complete on the tick that starts them.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("focus_secs", self.focus_secs),
            ("short_break_secs", self.short_break_secs),
            ("long_break_secs", self.long_break_secs),
            (
                "focus_phases_before_long_break",
                u64::from(self.focus_phases_before_long_break),
            ),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    /// Phase that follows `current`.
    ///
    /// `completed_focus_count` already includes the focus phase that is
    /// ending, so the 4th completed focus phase (with the default interval)
    /// is the one that earns a long break.
    pub fn next_phase(&self, current: Phase, completed_focus_count: u32) -> Phase {
        match current {
            Phase::Focus => {
                let every = self.focus_phases_before_long_break.max(1);
                if completed_focus_count > 0 && completed_focus_count % every == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Focus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations() {
        let d = CycleDurations::default();
        assert_eq!(d.duration_of(Phase::Focus), 1500);
        assert_eq!(d.duration_of(Phase::ShortBreak), 300);
        assert_eq!(d.duration_of(Phase::LongBreak), 900);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn fourth_focus_earns_long_break() {
        let d = CycleDurations::default();
        assert_eq!(d.next_phase(Phase::Focus, 1), Phase::ShortBreak);
        assert_eq!(d.next_phase(Phase::Focus, 3), Phase::ShortBreak);
        assert_eq!(d.next_phase(Phase::Focus, 4), Phase::LongBreak);
        assert_eq!(d.next_phase(Phase::Focus, 5), Phase::ShortBreak);
        assert_eq!(d.next_phase(Phase::Focus, 8), Phase::LongBreak);
    }

    #[test]
    fn breaks_return_to_focus() {
        let d = CycleDurations::default();
        assert_eq!(d.next_phase(Phase::ShortBreak, 1), Phase::Focus);
        assert_eq!(d.next_phase(Phase::LongBreak, 4), Phase::Focus);
    }

    #[test]
    fn zero_duration_rejected() {
        let d = CycleDurations {
            short_break_secs: 0,
            ..CycleDurations::default()
        };
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("short_break_secs"));
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Phase::ShortBreak).unwrap(),
            "\"short_break\""
        );
    }
}
