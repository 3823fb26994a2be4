//! Async driver for a [`FocusCycle`].
//!
//! The cycle is moved into a single tokio task that is its only writer.
//! Commands arrive over an mpsc channel and are answered with the
//! post-command snapshot. The one-second clock is an `Interval` that only
//! exists while the cycle is running, so a second `start` can never add a
//! second clock.
//!
//! When a phase completes, the session write and the notification are
//! spawned on their own tasks. The driver goes straight back to waiting for
//! the next tick, so a slow backend cannot stretch a second. Session writes
//! are tracked and drained on shutdown, bounded by
//! [`ControllerOptions::shutdown_grace`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, info, warn};

use super::machine::{CycleSnapshot, FocusCycle, Transition};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Notifier, PhaseNotification};
use crate::recorder::{NewStudySession, SessionRecorder};

const COMMAND_CAPACITY: usize = 32;
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Clamped to at least 1ms.
    pub tick_interval: Duration,
    /// Start the clock again right after a phase completes.
    pub auto_start_next_phase: bool,
    pub event_capacity: usize,
    /// How long shutdown waits for session writes still in flight.
    pub shutdown_grace: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            auto_start_next_phase: false,
            event_capacity: 256,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// External services a running cycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub recorder: Arc<dyn SessionRecorder>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Collaborators {
    pub fn new(recorder: Arc<dyn SessionRecorder>) -> Self {
        Self {
            recorder,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    Snapshot,
}

struct Request {
    command: Command,
    reply: oneshot::Sender<CycleSnapshot>,
}

/// Handle to a focus cycle running on its own task.
///
/// Dropping the handle or calling [`shutdown`](Self::shutdown) stops the
/// task once pending session writes finish or the grace period runs out.
/// Notifications in flight are not waited for.
pub struct FocusController {
    commands: mpsc::Sender<Request>,
    events: broadcast::Sender<Event>,
    task: JoinHandle<()>,
}

impl FocusController {
    /// Move `cycle` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn(
        cycle: FocusCycle,
        collaborators: Collaborators,
        mut options: ControllerOptions,
    ) -> Self {
        options.tick_interval = options.tick_interval.max(MIN_TICK_INTERVAL);
        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        let driver = Driver {
            cycle,
            collaborators,
            options,
            events: events.clone(),
            ticker: None,
            pending_records: JoinSet::new(),
        };
        let task = tokio::spawn(driver.run(rx));

        Self {
            commands,
            events,
            task,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(&self) -> Result<CycleSnapshot> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<CycleSnapshot> {
        self.request(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<CycleSnapshot> {
        self.request(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<CycleSnapshot> {
        self.request(Command::Skip).await
    }

    pub async fn snapshot(&self) -> Result<CycleSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Stop the driver task and wait for it to exit, including any session
    /// writes still in flight.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.commands);
        self.task
            .await
            .map_err(|e| CoreError::Custom(format!("focus controller task failed: {e}")))
    }

    async fn request(&self, command: Command) -> Result<CycleSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| CoreError::ControllerClosed)?;
        rx.await.map_err(|_| CoreError::ControllerClosed)
    }
}

struct Driver {
    cycle: FocusCycle,
    collaborators: Collaborators,
    options: ControllerOptions,
    events: broadcast::Sender<Event>,
    /// Present exactly while the cycle is running.
    ticker: Option<Interval>,
    pending_records: JoinSet<()>,
}

impl Driver {
    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        loop {
            tokio::select! {
                request = rx.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                Some(_) = self.pending_records.join_next(), if !self.pending_records.is_empty() => {}
            }
        }
        self.drain_records().await;
        debug!("focus controller stopped");
    }

    async fn drain_records(&mut self) {
        if self.pending_records.is_empty() {
            return;
        }
        let grace = self.options.shutdown_grace;
        let pending = &mut self.pending_records;
        let drained = time::timeout(grace, async {
            while pending.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                pending = self.pending_records.len(),
                "session writes still running at shutdown, abandoning them"
            );
            self.pending_records.abort_all();
        }
    }

    fn handle(&mut self, request: Request) {
        match request.command {
            Command::Start => self.start_clock(),
            Command::Pause => {
                self.ticker = None;
                if let Some(event) = self.cycle.pause() {
                    self.emit(event);
                }
            }
            Command::Reset => {
                self.ticker = None;
                let event = self.cycle.reset();
                self.emit(event);
            }
            Command::Skip => {
                let transition = self.cycle.skip();
                self.complete(transition);
            }
            Command::Snapshot => {}
        }
        // The caller may have given up waiting.
        let _ = request.reply.send(self.cycle.snapshot());
    }

    fn start_clock(&mut self) {
        if let Some(event) = self.cycle.start() {
            let period = self.options.tick_interval;
            self.ticker = Some(time::interval_at(Instant::now() + period, period));
            self.emit(event);
        }
    }

    fn on_tick(&mut self) {
        match self.cycle.tick() {
            Some(transition) => self.complete(transition),
            None => {
                let event = Event::Tick {
                    phase: self.cycle.phase(),
                    remaining_secs: self.cycle.remaining_secs(),
                };
                self.emit(event);
            }
        }
    }

    fn complete(&mut self, transition: Transition) {
        // The cycle stops itself on every transition.
        self.ticker = None;

        info!(
            from = %transition.from,
            to = %transition.to,
            completed_focus = transition.completed_focus_count,
            skipped = transition.skipped,
            "phase completed"
        );
        self.emit(transition.event());

        if let Some(session) = transition.session {
            self.dispatch_record(session);
        }
        self.dispatch_notification(transition.notification);

        if self.options.auto_start_next_phase {
            self.start_clock();
        }
    }

    fn dispatch_record(&mut self, session: NewStudySession) {
        let recorder = Arc::clone(&self.collaborators.recorder);
        let events = self.events.clone();
        self.pending_records.spawn(async move {
            let duration_secs = session.duration_secs;
            match recorder.record_focus_session(&session).await {
                Ok(record) => {
                    debug!(recorder = recorder.name(), id = %record.id, "focus session recorded");
                    let _ = events.send(Event::SessionRecorded {
                        id: record.id,
                        duration_secs,
                        at: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(recorder = recorder.name(), error = %e, "failed to record focus session");
                    let _ = events.send(Event::SessionRecordFailed {
                        duration_secs,
                        error: e.to_string(),
                        at: Utc::now(),
                    });
                }
            }
        });
    }

    fn dispatch_notification(&self, notification: PhaseNotification) {
        let Some(notifier) = self.collaborators.notifier.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_phase_change(&notification).await {
                debug!(error = %e, phase = %notification.phase, "notification not delivered");
            }
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CycleDurations, Phase};
    use crate::recorder::NullRecorder;

    fn short_cycle() -> FocusCycle {
        FocusCycle::new(CycleDurations {
            focus_secs: 5,
            short_break_secs: 2,
            long_break_secs: 3,
            focus_phases_before_long_break: 4,
        })
    }

    fn controller(options: ControllerOptions) -> FocusController {
        FocusController::spawn(
            short_cycle(),
            Collaborators::new(Arc::new(NullRecorder)),
            options,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let ctl = controller(ControllerOptions::default());
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(3_500)).await;
        let snap = ctl.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs, 2);
        assert!(snap.running);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_does_not_double_speed() {
        let ctl = controller(ControllerOptions::default());
        ctl.start().await.unwrap();
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(ctl.snapshot().await.unwrap().remaining_secs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_clock_does_not_move() {
        let ctl = controller(ControllerOptions::default());
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;
        ctl.pause().await.unwrap();
        time::sleep(Duration::from_secs(10)).await;
        let snap = ctl.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs, 4);
        assert!(!snap.running);

        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(ctl.snapshot().await.unwrap().remaining_secs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_stops_clock_without_auto_start() {
        let ctl = controller(ControllerOptions::default());
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(5_500)).await;
        let snap = ctl.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert_eq!(snap.remaining_secs, 2);
        assert!(!snap.running);
        assert_eq!(snap.completed_focus_count, 1);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ctl.snapshot().await.unwrap().remaining_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_start_runs_into_next_phase() {
        let ctl = controller(ControllerOptions {
            auto_start_next_phase: true,
            ..ControllerOptions::default()
        });
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(6_500)).await;
        let snap = ctl.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert_eq!(snap.remaining_secs, 1);
        assert!(snap.running);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_broadcast() {
        let ctl = controller(ControllerOptions::default());
        let mut events = ctl.subscribe();
        ctl.skip().await.unwrap();

        let first = events.recv().await.unwrap();
        assert!(matches!(
            first,
            Event::PhaseCompleted {
                from: Phase::Focus,
                to: Phase::ShortBreak,
                skipped: true,
                ..
            }
        ));
    }

    struct SlowRecorder {
        delay: Duration,
        saved: std::sync::mpsc::Sender<u64>,
    }

    #[async_trait::async_trait]
    impl SessionRecorder for SlowRecorder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn record_focus_session(
            &self,
            session: &NewStudySession,
        ) -> std::result::Result<crate::recorder::StudySessionRecord, crate::error::RecorderError>
        {
            time::sleep(self.delay).await;
            let _ = self.saved.send(session.duration_secs);
            NullRecorder.record_focus_session(session).await
        }
    }

    #[test]
    fn shutdown_waits_for_session_write() {
        let (saved, rx) = std::sync::mpsc::channel();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let ctl = FocusController::spawn(
                short_cycle(),
                Collaborators::new(Arc::new(SlowRecorder {
                    delay: Duration::from_millis(50),
                    saved,
                })),
                ControllerOptions::default(),
            );
            ctl.skip().await.unwrap();
            ctl.shutdown().await.unwrap();
        });
        drop(rt);
        assert_eq!(rx.try_recv(), Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_gives_up_on_stuck_write() {
        let (saved, rx) = std::sync::mpsc::channel();
        let ctl = FocusController::spawn(
            short_cycle(),
            Collaborators::new(Arc::new(SlowRecorder {
                delay: Duration::from_secs(3600),
                saved,
            })),
            ControllerOptions {
                shutdown_grace: Duration::from_secs(2),
                ..ControllerOptions::default()
            },
        );
        ctl.skip().await.unwrap();
        let started = Instant::now();
        ctl.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_interval_is_clamped() {
        let ctl = controller(ControllerOptions {
            tick_interval: Duration::ZERO,
            ..ControllerOptions::default()
        });
        ctl.start().await.unwrap();
        time::sleep(Duration::from_millis(10)).await;
        let snap = ctl.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert_eq!(snap.completed_focus_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_task() {
        let ctl = controller(ControllerOptions::default());
        ctl.shutdown().await.unwrap();
    }
}
