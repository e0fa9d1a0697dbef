use super::geometry::Point2D;

/// Named keypoints reported by the pose collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keypoint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Keypoint {
    pub const COUNT: usize = 17;

    pub const ALL: [Keypoint; Keypoint::COUNT] = [
        Keypoint::Nose,
        Keypoint::LeftEye,
        Keypoint::RightEye,
        Keypoint::LeftEar,
        Keypoint::RightEar,
        Keypoint::LeftShoulder,
        Keypoint::RightShoulder,
        Keypoint::LeftElbow,
        Keypoint::RightElbow,
        Keypoint::LeftWrist,
        Keypoint::RightWrist,
        Keypoint::LeftHip,
        Keypoint::RightHip,
        Keypoint::LeftKnee,
        Keypoint::RightKnee,
        Keypoint::LeftAnkle,
        Keypoint::RightAnkle,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Wire name used by landmark recordings.
    pub fn name(self) -> &'static str {
        match self {
            Keypoint::Nose => "nose",
            Keypoint::LeftEye => "leftEye",
            Keypoint::RightEye => "rightEye",
            Keypoint::LeftEar => "leftEar",
            Keypoint::RightEar => "rightEar",
            Keypoint::LeftShoulder => "leftShoulder",
            Keypoint::RightShoulder => "rightShoulder",
            Keypoint::LeftElbow => "leftElbow",
            Keypoint::RightElbow => "rightElbow",
            Keypoint::LeftWrist => "leftWrist",
            Keypoint::RightWrist => "rightWrist",
            Keypoint::LeftHip => "leftHip",
            Keypoint::RightHip => "rightHip",
            Keypoint::LeftKnee => "leftKnee",
            Keypoint::RightKnee => "rightKnee",
            Keypoint::LeftAnkle => "leftAnkle",
            Keypoint::RightAnkle => "rightAnkle",
        }
    }

    pub fn from_name(name: &str) -> Option<Keypoint> {
        Keypoint::ALL.into_iter().find(|kp| kp.name() == name)
    }
}

/// Landmark position normalized to the frame, nominally in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    pub fn to_pixels(self, width: u32, height: u32) -> Point2D {
        Point2D::new(self.x * width as f64, self.y * height as f64)
    }
}

/// One frame worth of landmarks. Read-only once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    present: bool,
    points: [Option<NormalizedPoint>; Keypoint::COUNT],
}

impl LandmarkSet {
    /// No person in the frame.
    pub fn absent() -> Self {
        Self {
            present: false,
            points: [None; Keypoint::COUNT],
        }
    }

    /// A detected person with the given keypoints. Keypoints not listed are missing.
    pub fn detected<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (Keypoint, NormalizedPoint)>,
    {
        let mut set = Self {
            present: true,
            points: [None; Keypoint::COUNT],
        };
        for (kp, p) in points {
            set.points[kp.index()] = Some(p);
        }
        set
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn get(&self, kp: Keypoint) -> Option<NormalizedPoint> {
        self.points[kp.index()]
    }

    /// Pixel position of `kp`, or `None` when it is missing or outside the frame.
    pub fn pixel(&self, kp: Keypoint, width: u32, height: u32) -> Option<Point2D> {
        self.get(kp)
            .filter(NormalizedPoint::in_range)
            .map(|p| p.to_pixels(width, height))
    }

    /// Every reported landmark in pixel space, in keypoint order.
    ///
    /// Off-frame points are pulled in to at most one frame size past each
    /// edge, so far-away estimates stay within drawable integer range.
    pub fn pixel_points(&self, width: u32, height: u32) -> Vec<Point2D> {
        if !self.present {
            return Vec::new();
        }
        self.points
            .iter()
            .flatten()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .map(|p| NormalizedPoint::new(p.x.clamp(-1.0, 2.0), p.y.clamp(-1.0, 2.0)))
            .map(|p| p.to_pixels(width, height))
            .collect()
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self::absent()
    }
}
