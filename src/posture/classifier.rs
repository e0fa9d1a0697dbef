use super::Rgb;
use super::geometry::{Point2D, angle_at};
use super::landmarks::{Keypoint, LandmarkSet};
use crate::assets::{COLOR_BAD, COLOR_GOOD, COLOR_UNSURE};
use crate::config::Thresholds;

/// Posture label for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostureVerdict {
    NoPersonDetected,
    CannotAnalyze,
    Correct,
    IncorrectForwardHead,
    IncorrectLeaning,
}

impl PostureVerdict {
    pub fn label(self) -> &'static str {
        match self {
            PostureVerdict::NoPersonDetected => "No Person Detected",
            PostureVerdict::CannotAnalyze => "Cannot Analyze",
            PostureVerdict::Correct => "Correct Posture",
            PostureVerdict::IncorrectForwardHead => "Incorrect: Forward Head",
            PostureVerdict::IncorrectLeaning => "Incorrect: Leaning",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            PostureVerdict::NoPersonDetected | PostureVerdict::CannotAnalyze => COLOR_UNSURE,
            PostureVerdict::Correct => COLOR_GOOD,
            PostureVerdict::IncorrectForwardHead | PostureVerdict::IncorrectLeaning => COLOR_BAD,
        }
    }

    pub fn is_incorrect(self) -> bool {
        matches!(
            self,
            PostureVerdict::IncorrectForwardHead | PostureVerdict::IncorrectLeaning
        )
    }
}

impl std::fmt::Display for PostureVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The five keypoints the rules look at, already in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeckPoints {
    pub left_shoulder: Point2D,
    pub right_shoulder: Point2D,
    pub left_ear: Point2D,
    pub right_ear: Point2D,
    pub nose: Point2D,
}

impl NeckPoints {
    pub fn extract(landmarks: &LandmarkSet, width: u32, height: u32) -> Option<Self> {
        let px = |kp| landmarks.pixel(kp, width, height);
        Some(Self {
            left_shoulder: px(Keypoint::LeftShoulder)?,
            right_shoulder: px(Keypoint::RightShoulder)?,
            left_ear: px(Keypoint::LeftEar)?,
            right_ear: px(Keypoint::RightEar)?,
            nose: px(Keypoint::Nose)?,
        })
    }

    /// Shoulder-ear-nose angles, left then right.
    pub fn neck_angles(&self) -> (f64, f64) {
        (
            angle_at(self.left_shoulder, self.left_ear, self.nose),
            angle_at(self.right_shoulder, self.right_ear, self.nose),
        )
    }

    pub fn shoulder_y_diff(&self) -> f64 {
        (self.left_shoulder.y - self.right_shoulder.y).abs()
    }
}

/// Rule-based classifier. Rules run in a fixed order and the first match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostureClassifier {
    thresholds: Thresholds,
}

impl PostureClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn classify(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> PostureVerdict {
        if !landmarks.is_present() {
            return PostureVerdict::NoPersonDetected;
        }
        match NeckPoints::extract(landmarks, width, height) {
            Some(points) => self.evaluate(&points),
            None => PostureVerdict::CannotAnalyze,
        }
    }

    pub fn evaluate(&self, points: &NeckPoints) -> PostureVerdict {
        let (left, right) = points.neck_angles();
        if !left.is_finite() || !right.is_finite() {
            return PostureVerdict::CannotAnalyze;
        }

        // rule 1: forward head, always ahead of the lean check
        let limit = self.thresholds.forward_head_angle_threshold_deg;
        if left < limit || right < limit {
            return PostureVerdict::IncorrectForwardHead;
        }

        // rule 2: lateral lean
        let diff = points.shoulder_y_diff();
        if !diff.is_finite() {
            return PostureVerdict::CannotAnalyze;
        }
        if diff > self.thresholds.shoulder_asymmetry_threshold_px {
            return PostureVerdict::IncorrectLeaning;
        }

        PostureVerdict::Correct
    }
}
