//! Posture analysis
//!
//! Pure, allocation-free analysis of a single landmark snapshot:
//! - `geometry`: vertex angles between pixel-space points
//! - `landmarks`: the named keypoint set produced by the pose collaborator
//! - `classifier`: ordered geometric rules yielding one verdict per frame

pub mod classifier;
pub mod geometry;
pub mod landmarks;

pub use classifier::{PostureClassifier, PostureVerdict};
pub use geometry::{Point2D, angle_at};
pub use landmarks::{Keypoint, LandmarkSet, NormalizedPoint};

/// 8-bit RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}
