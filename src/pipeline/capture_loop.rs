//! Capture/classify loop
//!
//! Runs on a blocking worker. Each iteration pulls one frame, mirrors it,
//! asks the pose estimator for landmarks, classifies them and posts the
//! annotated frame to the interactive thread. The loop checks its flag at the
//! top of every iteration and owns the device through a `DeviceGuard`, so the
//! device is released on every way out of the loop.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use super::bus::{FrameUpdate, UiBus};
use super::flag::RunningFlag;
use super::health::CaptureHealth;
use super::state::{ActivityState, SharedState};
use crate::assets::{BOX_THICKNESS_PX, LANDMARK_COLOR, LANDMARK_DOT_PX};
use crate::capture::{BoundingBox, DeviceGuard, Frame, PoseEstimator};
use crate::posture::{LandmarkSet, PostureClassifier, PostureVerdict};

/// Everything one run of the loop needs besides the device and the estimator.
pub struct LoopContext {
    pub flag: RunningFlag,
    pub bus: UiBus,
    pub classifier: PostureClassifier,
    pub box_padding_px: i32,
    pub health: Arc<CaptureHealth>,
    pub state: SharedState,
}

/// Why the loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The flag was lowered
    Cancelled,
    /// The device stopped producing frames
    StreamEnded(String),
    /// Nobody consumes the output any more
    ConsumerGone,
}

/// Draw landmarks and the padded bounding box in the verdict color.
pub fn annotate(
    frame: &Frame,
    landmarks: &LandmarkSet,
    verdict: PostureVerdict,
    padding: i32,
) -> (Frame, Option<BoundingBox>) {
    let points = landmarks.pixel_points(frame.width, frame.height);
    let bbox = BoundingBox::around(&points, padding);
    if points.is_empty() {
        return (frame.clone(), None);
    }

    let mut painter = frame.painter();
    for p in &points {
        painter.dot(*p, LANDMARK_DOT_PX, LANDMARK_COLOR);
    }
    if let Some(b) = &bbox {
        painter.stroke_box(b, BOX_THICKNESS_PX, verdict.color());
    }
    (painter.finish(), bbox)
}

/// Run until cancelled or the device fails. Hands the estimator back so the
/// next start can reuse it.
pub fn run(
    ctx: LoopContext,
    mut device: DeviceGuard,
    mut estimator: Box<dyn PoseEstimator>,
) -> (Box<dyn PoseEstimator>, LoopExit) {
    info!("Capture loop: running on {}", device.name());
    let mut last_tick: Option<Instant> = None;

    let exit = loop {
        if !ctx.flag.is_running() {
            break LoopExit::Cancelled;
        }

        let frame = match device.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Capture loop: {}", e);
                ctx.health.record_read_failure();
                ctx.bus
                    .post_status(format!("Camera stream ended: {}", e), "Capture loop");
                break LoopExit::StreamEnded(e.to_string());
            }
        };

        let frame = frame.mirrored();
        let landmarks = estimator.infer(&frame);
        let verdict = ctx.classifier.classify(&landmarks, frame.width, frame.height);
        if verdict == PostureVerdict::CannotAnalyze {
            ctx.health.record_analysis_failure();
        }

        let (annotated, bbox) = annotate(&frame, &landmarks, verdict, ctx.box_padding_px);

        let now = Instant::now();
        let fps = match last_tick {
            Some(prev) => {
                let dt = now.duration_since(prev).as_secs_f64();
                if dt > 0.0 { 1.0 / dt } else { 0.0 }
            }
            None => 0.0,
        };
        last_tick = Some(now);
        ctx.health.record_frame(fps);
        debug!("Capture loop: frame {} -> {}", frame.seq, verdict);

        let sent = ctx.bus.post_frame(FrameUpdate {
            frame: annotated,
            verdict,
            fps,
            bbox,
        });
        if sent.is_replaced() {
            ctx.health.record_frame_drop();
        } else if sent.is_closed() {
            break LoopExit::ConsumerGone;
        }
    };

    // also stops the health logger when the loop ends on its own
    ctx.flag.lower();
    ctx.state.transition(ActivityState::Stopping);
    drop(device);
    ctx.state.transition(ActivityState::Idle);
    info!("Capture loop: stopped ({:?})", exit);

    (estimator, exit)
}
