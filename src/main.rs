use crate::app::{App, AppCommand};
use crate::capture::{PoseEstimator, ReplayPose, ReplayRecording, ReplaySource};
use crate::config::{Config, IntervalPreset, app_name, version};
use crate::display::TerminalSurface;
use crate::notify::{DesktopNotifier, ModalNotifier, NotificationCenter};
use crate::pipeline::{Coordinator, ui_channel};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{process, thread};
use tokio::sync::mpsc;
use tracing_subscriber::filter::LevelFilter;

pub mod app;
pub mod assets;
pub mod capture;
pub mod config;
pub mod display;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod posture;

fn cli() -> Command {
    Command::new(app_name())
        .version(version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file.")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("camera")
                .long("camera")
                .value_name("INDEX")
                .help("Camera device index.")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("PRESET")
                .help("Reminder interval (5s, 30m, 1h, 1.5h, 2h).")
                .value_parser(|s: &str| s.parse::<IntervalPreset>().map_err(|e| e.to_string())),
        )
        .arg(
            Arg::new("replay")
                .short('r')
                .long("replay")
                .value_name("FILE")
                .help("Landmark recording to play back instead of a camera.")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("detect")
                .long("detect")
                .help("Start posture detection right away.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timer")
                .long("timer")
                .help("Start the reminder timer right away.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-popups")
                .long("no-popups")
                .help("Only use the terminal for reminders.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log verbosity (off, error, warn, info, debug, trace).")
                .default_value("info")
                .value_parser(|s: &str| s.parse::<LevelFilter>().map_err(|e| e.to_string())),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(index) = matches.get_one::<i32>("camera") {
        config.camera_index = *index;
    }
    if let Some(preset) = matches.get_one::<IntervalPreset>("interval") {
        config.interval_preset = *preset;
    }
    if let Some(path) = matches.get_one::<PathBuf>("replay") {
        config.replay_path = Some(path.clone());
    }
    if matches.get_flag("no-popups") {
        config.popups = false;
    }
    config.validate()?;
    Ok(config)
}

/// Send every parsed line as a command until the input or the app goes away.
///
/// At end of input a `quit` follows only when `quit_on_eof` is set.
fn forward_commands(input: impl BufRead, tx: &mpsc::UnboundedSender<AppCommand>, quit_on_eof: bool) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<AppCommand>() {
            Ok(command) => {
                if tx.send(command).is_err() {
                    return;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    if quit_on_eof {
        let _ = tx.send(AppCommand::Quit);
    } else {
        info!("Commands: input closed, stop with Ctrl-C");
    }
}

/// Forward stdin lines as commands. The thread is left behind on exit.
///
/// Ctrl-D quits an interactive session; a redirected stdin that runs dry
/// leaves the app running until a signal arrives.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<AppCommand>) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || forward_commands(std::io::stdin().lock(), &tx, interactive))
        .context("spawning stdin reader")?;
    Ok(())
}

async fn run(config: Config, mut startup: Vec<AppCommand>) -> anyhow::Result<()> {
    let recording = match &config.replay_path {
        Some(path) => {
            let recording = ReplayRecording::load(path)
                .with_context(|| format!("loading landmark recording {}", path.display()))?;
            info!("Replay: {} snapshots from {}", recording.len(), path.display());
            Some(Arc::new(recording))
        }
        None => None,
    };

    let source = ReplaySource::from_config(&config, recording.clone());
    let estimator: Box<dyn PoseEstimator> =
        Box::new(ReplayPose::new(recording.unwrap_or_default(), config.pose));

    let (bus, queue) = ui_channel();
    let coordinator = Coordinator::new(&config, Arc::new(source), estimator, bus);

    let mut notifications = NotificationCenter::new();
    let mut open_dialogs = None;
    if config.popups {
        let modal = ModalNotifier::new();
        open_dialogs = Some(modal.open_dialogs());
        notifications = notifications
            .with_sink(Arc::new(DesktopNotifier::new()))
            .with_sink(Arc::new(modal));
    }

    let mut app = App::new(
        coordinator,
        queue,
        Box::new(TerminalSurface::stdout()),
        notifications,
        config.interval_preset,
    );
    if let Some(counter) = open_dialogs {
        app = app.with_open_dialogs(counter);
    }

    let (tx, rx) = mpsc::unbounded_channel();
    for command in startup.drain(..) {
        tx.send(command)?;
    }

    // SIGINT, SIGTERM and SIGHUP request an orderly shutdown; a second one
    // once the app is gone exits right away
    let signal_tx = tx.clone();
    ctrlc::set_handler(move || {
        if signal_tx.send(AppCommand::Quit).is_err() {
            process::exit(130);
        }
    })
    .context("installing signal handler")?;

    spawn_stdin_reader(tx)?;

    let view = app.run(rx).await;
    info!("{} stopped: {}", app_name(), view);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let level = matches
        .get_one::<LevelFilter>("log-level")
        .copied()
        .unwrap_or(LevelFilter::INFO);
    // stdout belongs to the terminal surface
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&matches)?;
    info!("{} {} starting", app_name(), version());

    let mut startup = Vec::new();
    if matches.get_flag("detect") {
        startup.push(AppCommand::DetectStart);
    }
    if matches.get_flag("timer") {
        startup.push(AppCommand::TimerStart(None));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(app_name())
        .build()
        .context("building the async runtime")?;

    let result = runtime.block_on(run(config, startup));

    // unacknowledged dialogs keep their workers busy; do not wait for them
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded(input: &str, quit_on_eof: bool) -> Vec<AppCommand> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_commands(input.as_bytes(), &tx, quit_on_eof);
        drop(tx);
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    #[test]
    fn test_redirected_input_does_not_quit() {
        assert!(forwarded("", false).is_empty());
        assert_eq!(
            forwarded("detect start\n\nbogus\ntimer start 30m\n", false),
            vec![
                AppCommand::DetectStart,
                AppCommand::TimerStart(Some(IntervalPreset::HalfHour)),
            ]
        );
    }

    #[test]
    fn test_terminal_eof_quits() {
        assert_eq!(forwarded("status\n", true), vec![AppCommand::Status, AppCommand::Quit]);
    }

    #[test]
    fn test_cli_startup_flags() {
        let matches = cli()
            .try_get_matches_from(["posture-guard", "--detect", "--timer", "-i", "2h"])
            .unwrap();
        assert!(matches.get_flag("detect"));
        assert_eq!(matches.get_one::<IntervalPreset>("interval"), Some(&IntervalPreset::TwoHours));
    }
}
