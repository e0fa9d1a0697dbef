//! Health monitoring and metrics for the capture loop

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::flag::RunningFlag;

/// Health metrics for the capture loop
///
/// Written by the loop, read by the periodic logger. All fields use atomic
/// operations for thread-safe access.
pub struct CaptureHealth {
    /// Frames that went through the classifier
    pub frames_processed: AtomicU64,

    /// Frames not queued because the interactive thread had not taken the
    /// previous one yet
    pub frame_drops: AtomicU64,

    /// Frames whose verdict was `CannotAnalyze`
    pub analysis_failures: AtomicU64,

    /// Mid-run read failures, including end of stream
    pub read_failures: AtomicU64,

    /// Last measured frame rate, in milli-frames per second
    pub fps_milli: AtomicU64,
}

impl CaptureHealth {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frame_drops: AtomicU64::new(0),
            analysis_failures: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            fps_milli: AtomicU64::new(0),
        }
    }

    pub fn record_frame(&self, fps: f64) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        self.fps_milli
            .store((fps.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_frame_drop(&self) {
        self.frame_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analysis_failure(&self) {
        self.analysis_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn frame_drops(&self) -> u64 {
        self.frame_drops.load(Ordering::Relaxed)
    }

    pub fn analysis_failures(&self) -> u64 {
        self.analysis_failures.load(Ordering::Relaxed)
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures.load(Ordering::Relaxed)
    }

    pub fn fps(&self) -> f64 {
        self.fps_milli.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Calculate the frame drop rate as a percentage
    pub fn frame_drop_rate(&self) -> f64 {
        let drops = self.frame_drops();
        let processed = self.frames_processed();
        if processed == 0 {
            return 0.0;
        }
        (drops as f64 / processed as f64) * 100.0
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_processed: self.frames_processed(),
            frame_drops: self.frame_drops(),
            analysis_failures: self.analysis_failures(),
            read_failures: self.read_failures(),
            frame_drop_rate: self.frame_drop_rate(),
            fps: self.fps(),
        }
    }
}

impl Default for CaptureHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health metrics
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSummary {
    pub frames_processed: u64,
    pub frame_drops: u64,
    pub analysis_failures: u64,
    pub read_failures: u64,
    pub frame_drop_rate: f64,
    pub fps: f64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} frames at {:.1} fps ({} not displayed, {:.2}%), {} unanalyzable, {} read failures",
            self.frames_processed,
            self.fps,
            self.frame_drops,
            self.frame_drop_rate,
            self.analysis_failures,
            self.read_failures
        )
    }
}

/// Log a health summary every `every` until the flag is lowered.
pub async fn log_periodically(health: Arc<CaptureHealth>, flag: RunningFlag, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        tokio::select! {
            _ = flag.stopped() => break,
            _ = interval.tick() => log::info!("Capture loop: {}", health.summary()),
        }
    }
}
