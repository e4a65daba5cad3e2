use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use mindful_lib::breathing::visual::{format_mmss, render_bar};
use mindful_lib::breathing::PRESET_NAMES;
use mindful_lib::{
    init_logging, BreathVisual, BreathingPattern, ChannelObserver, ChannelSoundscape,
    ClockConfig, HistoryRecorder, MindfulSettings, SessionConfig, SessionController,
    SessionEvent, SessionOptions, SessionSnapshot, SettingsStore, SoundscapeCommand,
    SoundscapeId,
};

#[derive(Parser)]
#[command(name = "mindful")]
#[command(about = "Guided breathing sessions in the terminal")]
#[command(long_about = "mindful - guided breathing sessions in the terminal

While a session runs, type a command and press enter:
  p   pause
  r   resume
  c   cancel
Ctrl-C also cancels the session.")]
#[command(version)]
struct Cli {
    /// Session length in minutes (overrides the settings file)
    #[arg(short, long)]
    minutes: Option<u32>,

    /// Session length in seconds, for short sessions
    #[arg(short, long, conflicts_with = "minutes")]
    seconds: Option<u32>,

    /// Preset name or phase list, e.g. `box` or `inhale:4,hold:2,exhale:6`
    #[arg(short, long)]
    pattern: Option<String>,

    /// Soundscape to request from the audio layer
    #[arg(long)]
    soundscape: Option<String>,

    /// Run the clock this many times faster than real time
    #[arg(long, default_value_t = 1)]
    speed: u32,

    /// Settings file (JSON)
    #[arg(long, env = "MINDFUL_SETTINGS")]
    settings: Option<PathBuf>,

    /// List the built-in breathing patterns and exit
    #[arg(long)]
    list_patterns: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(LevelFilter::Warn);

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.list_patterns {
        for name in PRESET_NAMES {
            let pattern = BreathingPattern::preset(name)?;
            println!("{name:<10} {pattern} ({}s cycle)", pattern.cycle_secs());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone())?.settings(),
        None => MindfulSettings::default(),
    };
    let config = session_config(&cli, &settings)?;
    let mut clock = settings.clock_config();
    if cli.speed > 1 {
        clock = ClockConfig::accelerated(cli.speed);
    }

    let (soundscape, sound_rx) = ChannelSoundscape::new();
    std::thread::Builder::new()
        .name("soundscape".to_string())
        .spawn(move || {
            while let Ok(command) = sound_rx.recv() {
                match command {
                    SoundscapeCommand::Play(id) => log::info!("soundscape: playing {id}"),
                    other => log::info!("soundscape: {other:?}"),
                }
            }
        })
        .context("failed to spawn soundscape thread")?;

    let controller = SessionController::with_options(
        config.clone(),
        SessionOptions {
            clock,
            soundscape: Arc::new(soundscape),
            ..SessionOptions::default()
        },
    )?;

    let (observer, mut events) = ChannelObserver::new();
    let history = Arc::new(HistoryRecorder::new());
    let _events_subscription = controller.subscribe(Arc::new(observer));
    let _history_subscription = controller.subscribe(history.clone());

    println!(
        "{} of breathing ({}), p = pause, r = resume, c = cancel",
        format_mmss(config.target_secs),
        config.pattern
    );
    controller.start()?;

    let commands = controller.clone();
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                match line.trim() {
                    "p" | "pause" => commands.pause(),
                    "r" | "resume" => commands.resume(),
                    "c" | "cancel" | "q" => commands.cancel(),
                    _ => {}
                }
            }
        })
        .context("failed to spawn stdin reader")?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(ExitCode::FAILURE);
                };
                match event {
                    SessionEvent::Progress(snapshot) | SessionEvent::StateChanged(snapshot) => {
                        render(&snapshot)?;
                    }
                    SessionEvent::Completed(snapshot) => {
                        render(&snapshot)?;
                        println!(
                            "\nSession complete: {} breathing cycles, {} mindful.",
                            snapshot.progress.cycle_index,
                            format_mmss(snapshot.progress.elapsed_secs)
                        );
                        log::info!("history: {} completed session(s)", history.completed_count());
                        return Ok(ExitCode::SUCCESS);
                    }
                    SessionEvent::Cancelled(snapshot) => {
                        println!(
                            "\nSession cancelled after {}.",
                            format_mmss(snapshot.progress.elapsed_secs)
                        );
                        return Ok(ExitCode::from(130));
                    }
                    SessionEvent::Error(err) => {
                        eprintln!("\nerror: {err}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.cancel();
            }
        }
    }
}

fn session_config(cli: &Cli, settings: &MindfulSettings) -> Result<SessionConfig> {
    let pattern_source = cli.pattern.as_deref().unwrap_or(&settings.pattern);
    let pattern = BreathingPattern::parse(pattern_source)
        .with_context(|| format!("invalid pattern `{pattern_source}`"))?;

    let target_secs = match (cli.seconds, cli.minutes) {
        (Some(seconds), _) => seconds,
        (None, Some(minutes)) => minutes.saturating_mul(60),
        (None, None) => settings.default_minutes.saturating_mul(60),
    };

    let soundscape = cli
        .soundscape
        .as_deref()
        .map(SoundscapeId::from)
        .unwrap_or_else(|| SoundscapeId(settings.soundscape.clone()));

    Ok(SessionConfig::new(target_secs, pattern, soundscape))
}

fn render(snapshot: &SessionSnapshot) -> Result<()> {
    let visual = BreathVisual::from_snapshot(snapshot);
    let countdown = snapshot
        .progress
        .phase_duration_secs
        .saturating_sub(snapshot.progress.phase_elapsed_secs);
    let mut stdout = std::io::stdout().lock();
    write!(
        stdout,
        "\r{:<12} {:>2}s  {}  {} left  [{}]   ",
        visual.label,
        countdown,
        render_bar(snapshot.fraction_complete(), 24),
        format_mmss(snapshot.remaining_secs),
        snapshot.state
    )?;
    stdout.flush()?;
    Ok(())
}
