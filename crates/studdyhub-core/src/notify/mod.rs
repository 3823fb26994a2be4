//! Phase-change notifications.
//!
//! Notifiers are best effort. The controller dispatches them on a detached
//! task and ignores their result beyond a debug log line.

mod terminal;
mod webhook;

pub use terminal::TerminalNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cycle::{CycleDurations, Phase};
use crate::error::NotifyError;

/// On/off pulse lengths in milliseconds, starting with "on".
pub const VIBRATION_PATTERN_MS: [u64; 5] = [500, 200, 500, 200, 500];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseNotification {
    /// Phase being entered.
    pub phase: Phase,
    pub title: String,
    pub body: String,
    pub vibrate: bool,
}

impl PhaseNotification {
    /// Message for moving from `from` into `to`.
    pub fn for_transition(
        from: Phase,
        to: Phase,
        completed_focus_count: u32,
        durations: &CycleDurations,
    ) -> Self {
        let minutes = durations.duration_of(to).div_ceil(60);
        let (title, body) = match to {
            Phase::ShortBreak => (
                "Focus session complete".to_string(),
                format!("Nice work! Take a {minutes} minute break."),
            ),
            Phase::LongBreak => (
                "Time for a long break".to_string(),
                format!(
                    "{completed_focus_count} focus sessions done. Rest for {minutes} minutes."
                ),
            ),
            Phase::Focus if from.is_break() => (
                "Break is over".to_string(),
                format!("Back to studying for {minutes} minutes."),
            ),
            Phase::Focus => (
                "Focus".to_string(),
                format!("Study for {minutes} minutes."),
            ),
        };
        Self {
            phase: to,
            title,
            body,
            vibrate: true,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_phase_change(&self, notification: &PhaseNotification)
        -> Result<(), NotifyError>;
}

/// Sends every notification to each inner notifier.
///
/// One failing notifier does not stop the others; the first error is returned.
#[derive(Default)]
pub struct MultiNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn notify_phase_change(
        &self,
        notification: &PhaseNotification,
    ) -> Result<(), NotifyError> {
        let mut first_err = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify_phase_change(notification).await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>, bool);

    #[async_trait]
    impl Notifier for Counting {
        async fn notify_phase_change(&self, _: &PhaseNotification) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                Err(NotifyError::NotConfigured("test".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn messages_mention_phase_length() {
        let d = CycleDurations::default();
        let n = PhaseNotification::for_transition(Phase::Focus, Phase::ShortBreak, 1, &d);
        assert_eq!(n.phase, Phase::ShortBreak);
        assert!(n.body.contains("5 minute"));

        let n = PhaseNotification::for_transition(Phase::Focus, Phase::LongBreak, 4, &d);
        assert!(n.body.contains("4 focus sessions"));
        assert!(n.body.contains("15 minutes"));

        let n = PhaseNotification::for_transition(Phase::ShortBreak, Phase::Focus, 1, &d);
        assert_eq!(n.title, "Break is over");
        assert!(n.body.contains("25 minutes"));
    }

    #[tokio::test]
    async fn multi_notifier_reaches_everyone_despite_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let multi = MultiNotifier::new()
            .with(Counting(calls.clone(), true))
            .with(Counting(calls.clone(), false));
        let n = PhaseNotification::for_transition(
            Phase::Focus,
            Phase::ShortBreak,
            1,
            &CycleDurations::default(),
        );
        assert!(multi.notify_phase_change(&n).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
