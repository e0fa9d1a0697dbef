//! The interactive thread
//!
//! Owns the presentation state and is the only consumer of the `UiQueue`.
//! User commands and background results are handled one at a time, so every
//! change to what the user sees happens here and in order.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::assets::{CAMERA_ERROR_STATUS, IDLE_STATUS, TIMER_RESET_LABEL};
use crate::config::IntervalPreset;
use crate::display::DisplaySurface;
use crate::error::CaptureError;
use crate::notify::NotificationCenter;
use crate::pipeline::{Coordinator, StartOutcome, UiEvent, UiQueue};
use crate::posture::PostureVerdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Open the camera and start classifying
    DetectStart,
    /// Stop classifying and release the camera
    DetectStop,
    /// Start the reminder timer, with the configured preset when none is given
    TimerStart(Option<IntervalPreset>),
    /// Stop the reminder timer
    TimerStop,
    /// Print a summary of the current state
    Status,
    /// Stop everything and exit
    Quit,
}

impl FromStr for AppCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["detect", "start"] => Ok(AppCommand::DetectStart),
            ["detect", "stop"] => Ok(AppCommand::DetectStop),
            ["timer", "start"] => Ok(AppCommand::TimerStart(None)),
            ["timer", "start", preset] => preset
                .parse()
                .map(|p| AppCommand::TimerStart(Some(p)))
                .map_err(|e: crate::error::ConfigError| e.to_string()),
            ["timer", "stop"] => Ok(AppCommand::TimerStop),
            ["status"] => Ok(AppCommand::Status),
            ["quit"] | ["exit"] => Ok(AppCommand::Quit),
            _ => Err(format!(
                "unknown command '{}'; try: detect start|stop, timer start [5s|30m|1h|1.5h|2h], timer stop, status, quit",
                s.trim()
            )),
        }
    }
}

/// What the user currently sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub status: String,
    pub verdict: Option<PostureVerdict>,
    pub fps: f64,
    pub timer_label: String,
    pub reminders_fired: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            status: IDLE_STATUS.to_string(),
            verdict: None,
            fps: 0.0,
            timer_label: TIMER_RESET_LABEL.to_string(),
            reminders_fired: 0,
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {}", self.status)?;
        match self.verdict {
            Some(v) => write!(f, ", posture: {} ({:.1} fps)", v, self.fps)?,
            None => write!(f, ", posture: -")?,
        }
        write!(f, ", timer: {}, reminders: {}", self.timer_label, self.reminders_fired)
    }
}

pub struct App {
    coordinator: Coordinator,
    queue: UiQueue,
    surface: Box<dyn DisplaySurface>,
    notifications: NotificationCenter,
    default_preset: IntervalPreset,
    open_dialogs: Option<Arc<AtomicUsize>>,
    view: ViewState,
}

impl App {
    pub fn new(
        coordinator: Coordinator,
        queue: UiQueue,
        surface: Box<dyn DisplaySurface>,
        notifications: NotificationCenter,
        default_preset: IntervalPreset,
    ) -> Self {
        Self {
            coordinator,
            queue,
            surface,
            notifications,
            default_preset,
            open_dialogs: None,
            view: ViewState::default(),
        }
    }

    /// Report the number of unacknowledged dialogs in `status`.
    pub fn with_open_dialogs(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.open_dialogs = Some(counter);
        self
    }

    /// Process commands and background results until `Quit` or until the
    /// command source goes away, then shut every activity down.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<AppCommand>) -> ViewState {
        self.surface.show_status(&self.view.status);

        loop {
            tokio::select! {
                Some(event) = self.queue.recv() => self.apply(event),
                command = commands.recv() => match command {
                    Some(AppCommand::Quit) | None => break,
                    Some(command) => self.handle(command).await,
                },
            }
        }

        info!("App: quitting");
        self.coordinator.shutdown().await;
        while let Some(event) = self.queue.try_recv() {
            self.apply(event);
        }
        self.view
    }

    async fn handle(&mut self, command: AppCommand) {
        info!("App: {:?}", command);
        match command {
            AppCommand::DetectStart => match self.coordinator.start_detection().await {
                Ok(StartOutcome::Started) => self.set_status("Detecting posture".to_string()),
                Ok(StartOutcome::AlreadyRunning) => {
                    self.set_status("Detection is already running".to_string())
                }
                Err(CaptureError::DeviceUnavailable(reason)) => {
                    warn!("App: {}", reason);
                    self.set_status(CAMERA_ERROR_STATUS.to_string());
                }
                Err(e) => self.set_status(format!("Error: {}", e)),
            },
            AppCommand::DetectStop => {
                if self.coordinator.stop_detection().await {
                    self.view.verdict = None;
                    self.set_status(IDLE_STATUS.to_string());
                }
            }
            AppCommand::TimerStart(preset) => {
                let preset = preset.unwrap_or(self.default_preset);
                match self.coordinator.start_timer(preset).await {
                    StartOutcome::Started => self.set_status(format!("Reminder every {}", preset)),
                    StartOutcome::AlreadyRunning => {
                        let running = self.coordinator.timer_preset().unwrap_or(preset);
                        self.set_status(format!("Timer already running, reminder every {}", running));
                    }
                }
            }
            AppCommand::TimerStop => {
                self.coordinator.stop_timer().await;
            }
            AppCommand::Status => {
                let report = self.report();
                self.surface.show_report(&report);
            }
            // handled by the run loop
            AppCommand::Quit => {}
        }
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::FrameUpdate(update) => {
                // frames still queued when detection was stopped
                if !self.coordinator.is_detecting() {
                    debug!("App: dropping frame {} after stop", update.frame.seq);
                    return;
                }
                self.view.verdict = Some(update.verdict);
                self.view.fps = update.fps;
                self.surface.show_frame(&update);
            }
            UiEvent::StatusUpdate(text) => {
                self.view.verdict = None;
                self.set_status(text);
            }
            UiEvent::TimerUpdate(label) => {
                self.surface.show_timer(&label);
                self.view.timer_label = label;
            }
            UiEvent::NotificationEvent(notification) => {
                self.view.reminders_fired += 1;
                self.surface.show_notification(&notification);
                self.notifications.dispatch(&notification);
            }
        }
    }

    fn set_status(&mut self, text: String) {
        self.surface.show_status(&text);
        self.view.status = text;
    }

    fn report(&self) -> String {
        let mut report = self.view.to_string();
        report.push_str(if self.coordinator.is_detecting() {
            ", detection: running"
        } else {
            ", detection: idle"
        });
        if let Some(preset) = self.coordinator.timer_preset() {
            report.push_str(&format!(", interval: {}", preset));
        }
        if let Some(open) = &self.open_dialogs {
            report.push_str(&format!(", open reminders: {}", open.load(Ordering::Relaxed)));
        }
        if let Some(health) = self.coordinator.health() {
            report.push_str(&format!("\n{}", health));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, PoseEstimator};
    use crate::config::Config;
    use crate::pipeline::capture_loop::tests::{FixedPose, ScriptedSource, upright};
    use crate::pipeline::{Notification, ui_channel};
    use crate::pipeline::FrameUpdate;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingSurface {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSurface {
        fn push(&self, line: String) {
            self.lines.lock().unwrap().push(line);
        }

        fn contains(&self, needle: &str) -> bool {
            self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
        }
    }

    impl DisplaySurface for RecordingSurface {
        fn show_frame(&mut self, update: &FrameUpdate) {
            self.push(format!("frame {}", update.verdict));
        }

        fn show_status(&mut self, text: &str) {
            self.push(format!("status {}", text));
        }

        fn show_timer(&mut self, label: &str) {
            self.push(format!("timer {}", label));
        }

        fn show_notification(&mut self, notification: &Notification) {
            self.push(format!("reminder {}", notification.title));
        }

        fn show_report(&mut self, report: &str) {
            self.push(format!("report {}", report));
        }
    }

    fn app(source: impl FrameSource + 'static, pose: impl PoseEstimator + 'static) -> (App, RecordingSurface) {
        let (bus, queue) = ui_channel();
        let coordinator = Coordinator::new(&Config::default(), Arc::new(source), Box::new(pose), bus);
        let surface = RecordingSurface::default();
        let app = App::new(
            coordinator,
            queue,
            Box::new(surface.clone()),
            NotificationCenter::new(),
            IntervalPreset::FiveSeconds,
        );
        (app, surface)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("detect start".parse(), Ok(AppCommand::DetectStart));
        assert_eq!("  Detect   STOP ".parse(), Ok(AppCommand::DetectStop));
        assert_eq!("timer start".parse(), Ok(AppCommand::TimerStart(None)));
        assert_eq!(
            "timer start 1.5h".parse(),
            Ok(AppCommand::TimerStart(Some(IntervalPreset::HourAndHalf)))
        );
        assert_eq!("quit".parse(), Ok(AppCommand::Quit));
        assert!("timer start 3h".parse::<AppCommand>().is_err());
        assert!("dance".parse::<AppCommand>().unwrap_err().contains("unknown command"));
    }

    #[test]
    fn test_view_state_display() {
        let view = ViewState {
            verdict: Some(PostureVerdict::Correct),
            fps: 29.96,
            ..ViewState::default()
        };
        let text = view.to_string();
        assert!(text.contains("(30.0 fps)"));
        assert!(text.contains("timer: 00:00:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_reminder_reaches_surface() {
        let (app, surface) = app(ScriptedSource::endless(), FixedPose(upright()));
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = async move {
            tx.send(AppCommand::TimerStart(None)).unwrap();
            tokio::time::sleep(Duration::from_millis(5500)).await;
            tx.send(AppCommand::Status).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(AppCommand::Quit).unwrap();
        };
        let (view, ()) = tokio::join!(app.run(rx), driver);

        assert_eq!(view.reminders_fired, 1);
        assert_eq!(view.timer_label, TIMER_RESET_LABEL);
        assert!(surface.contains("timer 00:00:05"));
        assert!(surface.contains("reminder Change position"));
        assert!(surface.contains("interval: 5s"));
    }

    #[tokio::test]
    async fn test_unavailable_camera_shows_error() {
        let (app, surface) = app(ScriptedSource::broken(), FixedPose(upright()));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(AppCommand::DetectStart).unwrap();
        tx.send(AppCommand::Quit).unwrap();

        let view = app.run(rx).await;
        assert_eq!(view.status, CAMERA_ERROR_STATUS);
        assert!(surface.contains(CAMERA_ERROR_STATUS));
    }

    #[tokio::test]
    async fn test_detection_until_quit() {
        let (app, surface) = app(ScriptedSource::endless(), FixedPose(upright()));
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = async move {
            tx.send(AppCommand::DetectStart).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(AppCommand::DetectStop).unwrap();
            tx.send(AppCommand::Quit).unwrap();
        };
        let (view, ()) = tokio::join!(app.run(rx), driver);

        assert!(surface.contains("frame Correct"));
        assert_eq!(view.status, IDLE_STATUS);
        assert_eq!(view.verdict, None);

        // nothing from the stopped run is drawn after the idle prompt
        let lines = surface.lines.lock().unwrap();
        let idle = lines
            .iter()
            .rposition(|l| l == &format!("status {}", IDLE_STATUS))
            .unwrap();
        assert!(lines[idle..].iter().all(|l| !l.starts_with("frame")));
    }

    #[tokio::test]
    async fn test_closed_command_source_shuts_down() {
        let (app, _surface) = app(ScriptedSource::endless(), FixedPose(upright()));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(AppCommand::DetectStart).unwrap();
        drop(tx);
        let view = app.run(rx).await;
        assert_eq!(view.status, "Detecting posture");
    }
}
