use crate::posture::Rgb;

// posture rules
pub const FORWARD_HEAD_ANGLE_THRESHOLD_DEG: f64 = 165.0;
pub const SHOULDER_ASYMMETRY_THRESHOLD_PX: f64 = 25.0;

// pose estimator defaults, handed to the collaborator at construction
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.5;
pub const MIN_TRACKING_CONFIDENCE: f32 = 0.5;
pub const MODEL_COMPLEXITY: u8 = 1;

// annotation
pub const BOX_PADDING_PX: i32 = 10;
pub const BOX_THICKNESS_PX: i32 = 3;
pub const LANDMARK_DOT_PX: i32 = 2;
pub const LANDMARK_COLOR: Rgb = Rgb(255, 255, 255);

// verdict colors
pub const COLOR_GOOD: Rgb = Rgb(0, 255, 0);
pub const COLOR_BAD: Rgb = Rgb(255, 0, 0);
pub const COLOR_UNSURE: Rgb = Rgb(255, 165, 0);

// replay capture
pub const REPLAY_FRAME_WIDTH: u32 = 640;
pub const REPLAY_FRAME_HEIGHT: u32 = 480;
pub const REPLAY_FPS: u32 = 30;

// interactive loop
pub const HEALTH_LOG_INTERVAL_SECS: u64 = 30;
pub const TIMER_RESET_LABEL: &str = "00:00:00";
pub const IDLE_STATUS: &str = "Press 'detect start' to open the camera";
pub const CAMERA_ERROR_STATUS: &str =
    "Error: cannot open the camera. Check that it is connected and not used by another program";
