//! Lifecycle of the two background activities
//!
//! The coordinator owns at most one capture loop and one scheduler. Each run
//! gets a fresh `RunningFlag`; stopping lowers it and waits for the activity
//! to observe it, it never aborts a task. Results only reach the interactive
//! thread through the `UiBus`.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use super::bus::UiBus;
use super::capture_loop::{self, LoopContext, LoopExit};
use super::flag::RunningFlag;
use super::health::{self, CaptureHealth, HealthSummary};
use super::scheduler::{self, TimerState};
use super::state::{ActivityState, SharedState};
use crate::assets::HEALTH_LOG_INTERVAL_SECS;
use crate::capture::{DeviceGuard, FrameSource, PoseEstimator};
use crate::config::{Config, IntervalPreset};
use crate::error::CaptureError;
use crate::posture::PostureClassifier;

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The activity was already running; nothing was changed.
    AlreadyRunning,
}

struct CaptureRun {
    flag: RunningFlag,
    worker: JoinHandle<(Box<dyn PoseEstimator>, LoopExit)>,
    health_logger: JoinHandle<()>,
    health: Arc<CaptureHealth>,
}

struct TimerRun {
    flag: RunningFlag,
    task: JoinHandle<()>,
    preset: IntervalPreset,
}

pub struct Coordinator {
    source: Arc<dyn FrameSource>,
    /// Parked here between runs, moved into the loop while it runs
    estimator: Option<Box<dyn PoseEstimator>>,
    classifier: PostureClassifier,
    box_padding_px: i32,
    bus: UiBus,

    capture_state: SharedState,
    capture: Option<CaptureRun>,
    last_health: Option<HealthSummary>,

    timer_state: SharedState,
    timer: Option<TimerRun>,
}

impl Coordinator {
    pub fn new(
        config: &Config,
        source: Arc<dyn FrameSource>,
        estimator: Box<dyn PoseEstimator>,
        bus: UiBus,
    ) -> Self {
        let classifier = PostureClassifier::new(config.thresholds);
        info!(
            "Coordinator: {} with {:?}",
            source.describe(),
            classifier.thresholds()
        );
        Self {
            source,
            estimator: Some(estimator),
            classifier,
            box_padding_px: config.box_padding_px,
            bus,
            capture_state: SharedState::new("Capture loop"),
            capture: None,
            last_health: None,
            timer_state: SharedState::new("Scheduler"),
            timer: None,
        }
    }

    pub fn is_detecting(&self) -> bool {
        self.capture_state.get().is_running()
    }

    pub fn is_timing(&self) -> bool {
        self.timer_state.get().is_running()
    }

    pub fn timer_preset(&self) -> Option<IntervalPreset> {
        self.timer
            .as_ref()
            .filter(|run| !run.task.is_finished())
            .map(|run| run.preset)
    }

    /// Metrics of the current run, or of the last finished one.
    pub fn health(&self) -> Option<HealthSummary> {
        match &self.capture {
            Some(run) => Some(run.health.summary()),
            None => self.last_health.clone(),
        }
    }

    /// Open the device and start the capture loop.
    ///
    /// Device failures are returned before anything is spawned.
    pub async fn start_detection(&mut self) -> Result<StartOutcome, CaptureError> {
        if let Some(run) = &self.capture {
            if !run.worker.is_finished() {
                info!("Coordinator: capture loop already running");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        // a loop that ended on its own still holds the estimator
        if let Some(run) = self.capture.take() {
            self.reclaim_capture(run).await;
        }

        let Some(estimator) = self.estimator.take() else {
            return Err(CaptureError::Worker(
                "pose estimator was lost by an earlier run".into(),
            ));
        };

        let source = self.source.clone();
        let opened = tokio::task::spawn_blocking(move || DeviceGuard::open(source.as_ref()))
            .await
            .map_err(|e| CaptureError::Worker(e.to_string()))
            .and_then(|r| r);
        let device = match opened {
            Ok(device) => device,
            Err(e) => {
                warn!("Coordinator: cannot start capture loop: {}", e);
                self.estimator = Some(estimator);
                return Err(e);
            }
        };

        self.capture_state.transition(ActivityState::Running);
        let flag = RunningFlag::raised();
        let health = Arc::new(CaptureHealth::new());
        let health_logger = tokio::spawn(health::log_periodically(
            health.clone(),
            flag.clone(),
            Duration::from_secs(HEALTH_LOG_INTERVAL_SECS),
        ));

        let ctx = LoopContext {
            flag: flag.clone(),
            bus: self.bus.clone(),
            classifier: self.classifier,
            box_padding_px: self.box_padding_px,
            health: health.clone(),
            state: self.capture_state.clone(),
        };
        let worker = tokio::task::spawn_blocking(move || capture_loop::run(ctx, device, estimator));

        self.capture = Some(CaptureRun {
            flag,
            worker,
            health_logger,
            health,
        });
        info!("Coordinator: capture loop started");
        Ok(StartOutcome::Started)
    }

    /// Request the loop to stop and wait until it has released the device.
    /// Returns whether a loop was running.
    pub async fn stop_detection(&mut self) -> bool {
        let Some(run) = self.capture.take() else {
            return false;
        };
        let was_running = !run.worker.is_finished();
        run.flag.lower();
        self.reclaim_capture(run).await;
        info!("Coordinator: capture loop stopped");
        was_running
    }

    async fn reclaim_capture(&mut self, run: CaptureRun) {
        run.flag.lower();
        match run.worker.await {
            Ok((estimator, exit)) => {
                info!("Coordinator: capture loop exited ({:?})", exit);
                self.estimator = Some(estimator);
            }
            Err(e) => {
                // the guard was dropped during unwinding, only the estimator is gone
                error!("Coordinator: capture loop panicked: {}", e);
                self.capture_state.reset();
            }
        }
        if let Err(e) = run.health_logger.await {
            warn!("Coordinator: health logger failed: {}", e);
        }
        let summary = run.health.summary();
        info!("Coordinator: {}", summary);
        self.last_health = Some(summary);
    }

    /// Start the reminder timer with a fixed interval for the whole run.
    pub async fn start_timer(&mut self, preset: IntervalPreset) -> StartOutcome {
        if let Some(run) = &self.timer {
            if !run.task.is_finished() {
                info!("Coordinator: scheduler already running ({})", run.preset);
                return StartOutcome::AlreadyRunning;
            }
        }
        if let Some(run) = self.timer.take() {
            Self::reclaim_timer(run, &self.timer_state).await;
        }

        self.timer_state.transition(ActivityState::Running);
        let flag = RunningFlag::raised();
        let task = tokio::spawn(scheduler::run(
            TimerState::new(preset.seconds()),
            flag.clone(),
            self.bus.clone(),
            self.timer_state.clone(),
        ));
        self.timer = Some(TimerRun { flag, task, preset });
        info!("Coordinator: scheduler started ({})", preset);
        StartOutcome::Started
    }

    /// Stop the timer without a final reminder. Returns whether it was running.
    pub async fn stop_timer(&mut self) -> bool {
        let Some(run) = self.timer.take() else {
            return false;
        };
        let was_running = !run.task.is_finished();
        Self::reclaim_timer(run, &self.timer_state).await;
        info!("Coordinator: scheduler stopped");
        was_running
    }

    async fn reclaim_timer(run: TimerRun, state: &SharedState) {
        run.flag.lower();
        if let Err(e) = run.task.await {
            error!("Coordinator: scheduler task failed: {}", e);
            state.reset();
        }
    }

    /// Stop everything, whatever state each activity is in.
    pub async fn shutdown(&mut self) {
        info!("Coordinator: shutting down");
        self.stop_timer().await;
        self.stop_detection().await;
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        // cannot await here; make sure nothing keeps running unobserved
        if let Some(run) = &self.capture {
            run.flag.lower();
        }
        if let Some(run) = &self.timer {
            run.flag.lower();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bus::{Notification, UiEvent, UiQueue, ui_channel};
    use crate::pipeline::capture_loop::tests::{FixedPose, ScriptedSource, upright};
    use std::sync::atomic::Ordering;

    fn coordinator(source: ScriptedSource) -> (Coordinator, UiQueue) {
        let (bus, queue) = ui_channel();
        let coordinator = Coordinator::new(
            &Config::default(),
            Arc::new(source),
            Box::new(FixedPose(upright())),
            bus,
        );
        (coordinator, queue)
    }

    fn notifications(queue: &mut UiQueue) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Some(event) = queue.try_recv() {
            if let UiEvent::NotificationEvent(n) = event {
                out.push(n);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_timer_start() {
        let (mut coordinator, mut queue) = coordinator(ScriptedSource::endless());

        assert_eq!(coordinator.start_timer(IntervalPreset::FiveSeconds).await, StartOutcome::Started);
        assert_eq!(
            coordinator.start_timer(IntervalPreset::OneHour).await,
            StartOutcome::AlreadyRunning
        );
        assert_eq!(coordinator.timer_preset(), Some(IntervalPreset::FiveSeconds));

        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(notifications(&mut queue).len(), 1);
        assert!(coordinator.is_timing());

        assert!(coordinator.stop_timer().await);
        assert!(!coordinator.is_timing());
        assert!(!coordinator.stop_timer().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_restart_starts_from_first_entry() {
        let (mut coordinator, mut queue) = coordinator(ScriptedSource::endless());

        coordinator.start_timer(IntervalPreset::FiveSeconds).await;
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let fired = notifications(&mut queue);
        assert_eq!(fired.iter().map(|n| n.level).collect::<Vec<_>>(), vec![0, 1]);

        coordinator.stop_timer().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(notifications(&mut queue).is_empty());

        assert_eq!(coordinator.start_timer(IntervalPreset::FiveSeconds).await, StartOutcome::Started);
        tokio::time::sleep(Duration::from_millis(5500)).await;
        let fired = notifications(&mut queue);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].level, 0);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_detection_start_stop_restart() {
        let source = ScriptedSource::endless();
        let (opens, releases) = (source.opens.clone(), source.releases.clone());
        let (mut coordinator, _queue) = coordinator(source);

        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::Started));
        assert!(coordinator.is_detecting());
        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::AlreadyRunning));
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(coordinator.stop_detection().await);
        assert!(!coordinator.is_detecting());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(coordinator.health().unwrap().frames_processed > 0);

        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::Started));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        coordinator.shutdown().await;
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_device_is_reported() {
        let (mut coordinator, _queue) = coordinator(ScriptedSource::broken());

        let err = coordinator.start_detection().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(!coordinator.is_detecting());
        assert!(!coordinator.stop_detection().await);

        // the estimator is still parked, so a retry reports the device again
        let err = coordinator.start_detection().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_restart_after_stream_end() {
        let source = ScriptedSource::ending_after(2);
        let (opens, releases) = (source.opens.clone(), source.releases.clone());
        let (mut coordinator, _queue) = coordinator(source);

        coordinator.start_detection().await.unwrap();
        while coordinator.is_detecting() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::Started));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_off_frame_landmarks_keep_detection_usable() {
        use crate::posture::{Keypoint, LandmarkSet, NormalizedPoint};

        let (bus, _queue) = ui_channel();
        let far = LandmarkSet::detected([
            (Keypoint::LeftHip, NormalizedPoint::new(1e10, 0.5)),
            (Keypoint::RightHip, NormalizedPoint::new(-1e10, 0.5)),
        ]);
        let mut coordinator = Coordinator::new(
            &Config::default(),
            Arc::new(ScriptedSource::endless()),
            Box::new(FixedPose(far)),
            bus,
        );

        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::Started));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(coordinator.is_detecting());
        assert!(coordinator.stop_detection().await);
        assert!(coordinator.health().unwrap().frames_processed > 0);

        assert_eq!(coordinator.start_detection().await, Ok(StartOutcome::Started));
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_when_idle() {
        let (mut coordinator, _queue) = coordinator(ScriptedSource::endless());
        coordinator.shutdown().await;
        assert!(!coordinator.is_detecting());
        assert!(!coordinator.is_timing());
    }
}
