use std::io::Write;
use std::sync::Arc;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use studdyhub_core::{
    BackendKind, Collaborators, Config, ControllerOptions, CycleSnapshot, Database, Event,
    FocusController, FocusCycle, LocalRecorder, MultiNotifier, Notifier, NullRecorder,
    RemoteRecorder, RemoteRecorderConfig, SessionRecorder, TerminalNotifier, WebhookNotifier,
};

#[derive(Args)]
pub struct FocusArgs {
    /// Focus phase length in seconds (overrides config)
    #[arg(long)]
    focus_secs: Option<u64>,
    /// Short break length in seconds (overrides config)
    #[arg(long)]
    short_break_secs: Option<u64>,
    /// Long break length in seconds (overrides config)
    #[arg(long)]
    long_break_secs: Option<u64>,
    /// Start the next phase automatically when one ends
    #[arg(long)]
    auto_start: bool,
    /// Start the clock immediately
    #[arg(long)]
    start: bool,
    /// Do not persist completed focus phases
    #[arg(long)]
    no_record: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Start,
    Pause,
    Reset,
    Skip,
    Status,
    Help,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Option<Input> {
    let word = line.trim().to_ascii_lowercase();
    let input = match word.as_str() {
        "" => return None,
        "start" | "s" | "resume" => Input::Start,
        "pause" | "p" => Input::Pause,
        "reset" | "r" => Input::Reset,
        "skip" | "n" | "next" => Input::Skip,
        "status" | "st" => Input::Status,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => Input::Unknown,
    };
    Some(input)
}

const HELP: &str = "commands: start (s), pause (p), reset (r), skip (n), status, quit (q)";

pub fn run(args: FocusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(session(args, config))
}

fn build_recorder(
    config: &Config,
    no_record: bool,
) -> Result<Arc<dyn SessionRecorder>, Box<dyn std::error::Error>> {
    if no_record {
        return Ok(Arc::new(NullRecorder));
    }
    let recorder: Arc<dyn SessionRecorder> = match config.backend.kind {
        BackendKind::Local => Arc::new(LocalRecorder::new(Database::open()?)),
        BackendKind::Remote => Arc::new(RemoteRecorder::new(RemoteRecorderConfig {
            base_url: config.backend.url.clone().unwrap_or_default(),
            table: config.backend.table.clone(),
            api_key: config.backend.resolved_api_key(),
        })?),
        BackendKind::None => Arc::new(NullRecorder),
    };
    Ok(recorder)
}

fn build_notifier(config: &Config) -> Option<Arc<dyn Notifier>> {
    if !config.notifications.enabled {
        return None;
    }
    let mut notifier = MultiNotifier::new()
        .with(TerminalNotifier::stdout().with_vibration(config.notifications.vibration));
    if let Some(url) = config.notifications.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        notifier = notifier.with(WebhookNotifier::new(url));
    }
    Some(Arc::new(notifier))
}

async fn session(args: FocusArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut durations = config.durations();
    if let Some(secs) = args.focus_secs {
        durations.focus_secs = secs;
    }
    if let Some(secs) = args.short_break_secs {
        durations.short_break_secs = secs;
    }
    if let Some(secs) = args.long_break_secs {
        durations.long_break_secs = secs;
    }
    durations.validate()?;

    let mut collaborators = Collaborators::new(build_recorder(&config, args.no_record)?);
    if let Some(notifier) = build_notifier(&config) {
        collaborators = collaborators.with_notifier(notifier);
    }

    let cycle = FocusCycle::new(durations).with_session_defaults(config.session);
    let options = ControllerOptions {
        auto_start_next_phase: args.auto_start || config.cycle.auto_start_next_phase,
        ..ControllerOptions::default()
    };
    let controller = FocusController::spawn(cycle, collaborators, options);
    let mut events = controller.subscribe();

    println!("{HELP}");
    let snapshot = if args.start {
        controller.start().await?
    } else {
        controller.snapshot().await?
    };
    render_status(&snapshot);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(input) = parse_input(&line) else { continue };
                let snapshot = match input {
                    Input::Start => controller.start().await?,
                    Input::Pause => controller.pause().await?,
                    Input::Reset => controller.reset().await?,
                    Input::Skip => controller.skip().await?,
                    Input::Status => {
                        let snap = controller.snapshot().await?;
                        println!("{}", serde_json::to_string_pretty(&Event::StateSnapshot(snap))?);
                        continue;
                    }
                    Input::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Input::Quit => break,
                    Input::Unknown => {
                        println!("unknown command: {}", line.trim());
                        println!("{HELP}");
                        continue;
                    }
                };
                render_status(&snapshot);
            }
            event = events.recv() => match event {
                Ok(event) => render_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await?;
    Ok(())
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn render_status(snapshot: &CycleSnapshot) {
    let state = if snapshot.running { "running" } else { "paused" };
    println!(
        "{} {} ({state}, {} focus sessions done)",
        snapshot.phase,
        format_clock(snapshot.remaining_secs),
        snapshot.completed_focus_count
    );
}

fn render_event(event: &Event) {
    match event {
        Event::Tick {
            phase,
            remaining_secs,
        } => {
            print!("\r{phase} {} ", format_clock(*remaining_secs));
            let _ = std::io::stdout().flush();
        }
        Event::PhaseCompleted {
            from,
            to,
            completed_focus_count,
            ..
        } => {
            println!("\n{from} finished -> {to} (focus sessions: {completed_focus_count})");
        }
        Event::SessionRecordFailed { error, .. } => {
            eprintln!("\nwarning: study session was not saved: {error}");
        }
        _ => {}
    }
}
