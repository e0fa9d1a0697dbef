//! Frame capture
//!
//! Frame sources and the pose estimator are external collaborators reached
//! through the traits in `traits`. The replay backend stands in for a camera
//! and model when running without hardware.

pub mod frame;
pub mod replay;
mod traits;

pub use frame::{BoundingBox, Frame, Painter};
pub use replay::{ReplayPose, ReplayRecording, ReplaySource};
pub use traits::{FrameHandle, FrameSource, PoseEstimator};

use crate::error::CaptureError;
use log::info;

/// Scoped ownership of an opened device. The handle is released when the
/// guard drops, on every exit path of the capture loop.
pub struct DeviceGuard {
    handle: Box<dyn FrameHandle>,
    name: String,
}

impl DeviceGuard {
    pub fn open(source: &dyn FrameSource) -> Result<Self, CaptureError> {
        let handle = source.open()?;
        let name = source.describe();
        info!("DeviceGuard: opened {}", name);
        Ok(Self { handle, name })
    }

    pub fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        self.handle.read_frame()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.handle.release();
        info!("DeviceGuard: released {}", self.name);
    }
}
