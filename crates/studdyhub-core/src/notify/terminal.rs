use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Notifier, PhaseNotification, VIBRATION_PATTERN_MS};
use crate::error::NotifyError;

/// Prints notifications and renders the vibration pattern as bell pulses.
pub struct TerminalNotifier {
    out: Mutex<Box<dyn Write + Send>>,
    vibration: bool,
}

impl TerminalNotifier {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            vibration: true,
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn with_vibration(mut self, enabled: bool) -> Self {
        self.vibration = enabled;
        self
    }

    fn write(&self, bytes: &[u8]) -> Result<(), NotifyError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| std::io::Error::other("notification output poisoned"))?;
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn notify_phase_change(
        &self,
        notification: &PhaseNotification,
    ) -> Result<(), NotifyError> {
        let text = format!("\n[{}] {}\n", notification.title, notification.body);
        self.write(text.as_bytes())?;

        if self.vibration && notification.vibrate {
            // Even slots are "on" pulses, odd slots are gaps.
            for (i, ms) in VIBRATION_PATTERN_MS.iter().enumerate() {
                if i % 2 == 0 {
                    self.write(b"\x07")?;
                }
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
        Ok(())
    }
}
