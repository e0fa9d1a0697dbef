//! Boundaries to the external camera and pose-estimation collaborators

use super::frame::Frame;
use crate::error::CaptureError;
use crate::posture::LandmarkSet;

/// A device that can be opened for frames.
///
/// Implementations are shared between starts of the capture loop, so opening
/// must not consume the source.
pub trait FrameSource: Send + Sync {
    /// Acquire the device. Fails fast with `DeviceUnavailable`.
    fn open(&self) -> Result<Box<dyn FrameHandle>, CaptureError>;

    /// Human-readable device name for logs and status text.
    fn describe(&self) -> String;
}

/// An opened device. Exclusively owned by one capture loop at a time.
pub trait FrameHandle: Send {
    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Give the device back. Called exactly once through `DeviceGuard`.
    fn release(&mut self);
}

/// Black-box pose model: one frame in, one landmark snapshot out.
///
/// Confidence settings are fixed when the estimator is built.
pub trait PoseEstimator: Send {
    fn infer(&mut self, frame: &Frame) -> LandmarkSet;
}
