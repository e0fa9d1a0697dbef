//! Replay backend
//!
//! Plays back a JSON-lines landmark recording in place of a camera and pose
//! model. Each line is `null` (nobody in view) or an object mapping keypoint
//! names to `[x, y]` normalized coordinates:
//!
//! ```text
//! {"nose": [0.5, 0.2], "leftEar": [0.46, 0.25], "rightEar": [0.54, 0.25], ...}
//! null
//! ```
//!
//! The source yields blank frames tagged with a sequence number; the pose side
//! looks the landmarks up by that number.

use super::frame::Frame;
use super::traits::{FrameHandle, FrameSource, PoseEstimator};
use crate::config::{Config, PoseOptions};
use crate::error::{CaptureError, ConfigError};
use crate::posture::{Keypoint, LandmarkSet, NormalizedPoint};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Landmark snapshots in playback order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayRecording {
    snapshots: Vec<LandmarkSet>,
}

impl ReplayRecording {
    pub fn new(snapshots: Vec<LandmarkSet>) -> Self {
        Self { snapshots }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut snapshots = Vec::new();
        for (no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let raw: Option<HashMap<String, [f64; 2]>> = serde_json::from_str(line)?;
            let snapshot = match raw {
                None => LandmarkSet::absent(),
                Some(points) => {
                    let mut parsed = Vec::with_capacity(points.len());
                    for (name, [x, y]) in points {
                        let kp = Keypoint::from_name(&name).ok_or_else(|| {
                            ConfigError::Invalid(format!(
                                "line {}: unknown keypoint '{}'",
                                no + 1,
                                name
                            ))
                        })?;
                        parsed.push((kp, NormalizedPoint::new(x, y)));
                    }
                    LandmarkSet::detected(parsed)
                }
            };
            snapshots.push(snapshot);
        }
        Ok(Self { snapshots })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, seq: u64) -> Option<&LandmarkSet> {
        usize::try_from(seq).ok().and_then(|i| self.snapshots.get(i))
    }
}

/// Frame source that paces blank frames over a recording.
///
/// Without a recording there is no backend for the configured camera and
/// opening fails with `DeviceUnavailable`.
pub struct ReplaySource {
    camera_index: i32,
    recording: Option<Arc<ReplayRecording>>,
    width: u32,
    height: u32,
    frame_interval: Duration,
}

impl ReplaySource {
    pub fn new(camera_index: i32, recording: Option<Arc<ReplayRecording>>) -> Self {
        Self {
            camera_index,
            recording,
            width: crate::assets::REPLAY_FRAME_WIDTH,
            height: crate::assets::REPLAY_FRAME_HEIGHT,
            frame_interval: Duration::from_secs(1) / crate::assets::REPLAY_FPS,
        }
    }

    pub fn from_config(config: &Config, recording: Option<Arc<ReplayRecording>>) -> Self {
        Self::new(config.camera_index, recording)
            .with_frame_size(config.replay_frame_width, config.replay_frame_height)
            .with_fps(config.replay_fps)
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval = Duration::from_secs(1) / fps.max(1);
        self
    }
}

impl FrameSource for ReplaySource {
    fn open(&self) -> Result<Box<dyn FrameHandle>, CaptureError> {
        let Some(recording) = &self.recording else {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no capture backend for camera {}; pass a landmark recording to replay",
                self.camera_index
            )));
        };
        Ok(Box::new(ReplayHandle {
            total: recording.len() as u64,
            next_seq: 0,
            width: self.width,
            height: self.height,
            frame_interval: self.frame_interval,
            last_frame: None,
        }))
    }

    fn describe(&self) -> String {
        match &self.recording {
            Some(r) => format!("replay camera {} ({} frames)", self.camera_index, r.len()),
            None => format!("camera {}", self.camera_index),
        }
    }
}

struct ReplayHandle {
    total: u64,
    next_seq: u64,
    width: u32,
    height: u32,
    frame_interval: Duration,
    last_frame: Option<Instant>,
}

impl FrameHandle for ReplayHandle {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.next_seq >= self.total {
            return Err(CaptureError::EndOfStream);
        }
        if let Some(last) = self.last_frame {
            let due = last + self.frame_interval;
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.last_frame = Some(Instant::now());

        let frame = Frame::blank(self.width, self.height, self.next_seq);
        self.next_seq += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        debug!("ReplayHandle: released after {} frames", self.next_seq);
        self.next_seq = self.total;
    }
}

/// Pose estimator that answers from the recording by frame sequence number.
pub struct ReplayPose {
    recording: Arc<ReplayRecording>,
}

impl ReplayPose {
    pub fn new(recording: Arc<ReplayRecording>, options: PoseOptions) -> Self {
        info!(
            "ReplayPose: detection={} tracking={} complexity={}",
            options.min_detection_confidence,
            options.min_tracking_confidence,
            options.model_complexity
        );
        Self { recording }
    }
}

impl PoseEstimator for ReplayPose {
    fn infer(&mut self, frame: &Frame) -> LandmarkSet {
        match self.recording.get(frame.seq) {
            Some(set) => set.clone(),
            None => {
                warn!("ReplayPose: no landmarks for frame {}", frame.seq);
                LandmarkSet::absent()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"
# upright, then away from the desk
{"nose": [0.5, 0.1], "leftEar": [0.48, 0.5], "rightEar": [0.52, 0.5], "leftShoulder": [0.48, 0.7], "rightShoulder": [0.52, 0.7]}
null
"#;

    #[test]
    fn test_parse_recording() {
        let recording = ReplayRecording::parse(RECORDING).unwrap();
        assert_eq!(recording.len(), 2);

        let first = recording.get(0).unwrap();
        assert!(first.is_present());
        assert_eq!(first.get(Keypoint::Nose), Some(NormalizedPoint::new(0.5, 0.1)));
        assert!(!recording.get(1).unwrap().is_present());
        assert!(recording.get(2).is_none());
    }

    #[test]
    fn test_unknown_keypoint_rejected() {
        let err = ReplayRecording::parse(r#"{"tail": [0.1, 0.1]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_recording_is_unavailable() {
        let source = ReplaySource::new(1, None);
        let err = source.open().err().unwrap();
        assert!(matches!(err, CaptureError::DeviceUnavailable(msg) if msg.contains("camera 1")));
    }

    #[test]
    fn test_handle_plays_then_ends() {
        let recording = Arc::new(ReplayRecording::parse(RECORDING).unwrap());
        let source = ReplaySource::new(0, Some(recording.clone()))
            .with_frame_size(8, 6)
            .with_fps(1000);
        let mut handle = source.open().unwrap();
        let mut pose = ReplayPose::new(recording, PoseOptions::default());

        let first = handle.read_frame().unwrap();
        assert_eq!((first.width, first.height, first.seq), (8, 6, 0));
        assert!(pose.infer(&first).is_present());

        let second = handle.read_frame().unwrap();
        assert!(!pose.infer(&second).is_present());

        assert_eq!(handle.read_frame(), Err(CaptureError::EndOfStream));
        handle.release();
    }
}
