use crate::assets::{
    BOX_PADDING_PX, FORWARD_HEAD_ANGLE_THRESHOLD_DEG, MIN_DETECTION_CONFIDENCE,
    MIN_TRACKING_CONFIDENCE, MODEL_COMPLEXITY, REPLAY_FPS, REPLAY_FRAME_HEIGHT,
    REPLAY_FRAME_WIDTH, SHOULDER_ASYMMETRY_THRESHOLD_PX,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Reminder intervals offered to the user. Fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntervalPreset {
    #[default]
    #[serde(rename = "5s")]
    FiveSeconds,
    #[serde(rename = "30m")]
    HalfHour,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1.5h")]
    HourAndHalf,
    #[serde(rename = "2h")]
    TwoHours,
}

impl IntervalPreset {
    pub const ALL: [IntervalPreset; 5] = [
        IntervalPreset::FiveSeconds,
        IntervalPreset::HalfHour,
        IntervalPreset::OneHour,
        IntervalPreset::HourAndHalf,
        IntervalPreset::TwoHours,
    ];

    pub fn seconds(self) -> u64 {
        match self {
            IntervalPreset::FiveSeconds => 5,
            IntervalPreset::HalfHour => 30 * 60,
            IntervalPreset::OneHour => 60 * 60,
            IntervalPreset::HourAndHalf => 90 * 60,
            IntervalPreset::TwoHours => 120 * 60,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntervalPreset::FiveSeconds => "5s",
            IntervalPreset::HalfHour => "30m",
            IntervalPreset::OneHour => "1h",
            IntervalPreset::HourAndHalf => "1.5h",
            IntervalPreset::TwoHours => "2h",
        }
    }
}

impl fmt::Display for IntervalPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IntervalPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        IntervalPreset::ALL
            .into_iter()
            .find(|p| p.label() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = IntervalPreset::ALL.iter().map(|p| p.label()).collect();
                ConfigError::Invalid(format!(
                    "unknown interval '{}', expected one of {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Geometric rule thresholds used by the posture classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub forward_head_angle_threshold_deg: f64,
    pub shoulder_asymmetry_threshold_px: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            forward_head_angle_threshold_deg: FORWARD_HEAD_ANGLE_THRESHOLD_DEG,
            shoulder_asymmetry_threshold_px: SHOULDER_ASYMMETRY_THRESHOLD_PX,
        }
    }
}

/// Confidence settings passed through to the pose-estimation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoseOptions {
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub model_complexity: u8,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            min_detection_confidence: MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: MIN_TRACKING_CONFIDENCE,
            model_complexity: MODEL_COMPLEXITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub camera_index: i32,
    pub interval_preset: IntervalPreset,
    #[serde(flatten)]
    pub thresholds: Thresholds,
    #[serde(flatten)]
    pub pose: PoseOptions,
    pub box_padding_px: i32,
    pub replay_path: Option<PathBuf>,
    pub replay_frame_width: u32,
    pub replay_frame_height: u32,
    pub replay_fps: u32,
    pub popups: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            interval_preset: IntervalPreset::default(),
            thresholds: Thresholds::default(),
            pose: PoseOptions::default(),
            box_padding_px: BOX_PADDING_PX,
            replay_path: None,
            replay_frame_width: REPLAY_FRAME_WIDTH,
            replay_frame_height: REPLAY_FRAME_HEIGHT,
            replay_fps: REPLAY_FPS,
            popups: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if !(t.forward_head_angle_threshold_deg.is_finite()
            && t.forward_head_angle_threshold_deg > 0.0
            && t.forward_head_angle_threshold_deg <= 180.0)
        {
            return Err(ConfigError::Invalid(format!(
                "forwardHeadAngleThresholdDeg must be in (0, 180], got {}",
                t.forward_head_angle_threshold_deg
            )));
        }
        if !(t.shoulder_asymmetry_threshold_px.is_finite()
            && t.shoulder_asymmetry_threshold_px > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "shoulderAsymmetryThresholdPx must be positive, got {}",
                t.shoulder_asymmetry_threshold_px
            )));
        }

        let p = &self.pose;
        for (name, value) in [
            ("minDetectionConfidence", p.min_detection_confidence),
            ("minTrackingConfidence", p.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if p.model_complexity > 2 {
            return Err(ConfigError::Invalid(format!(
                "modelComplexity must be 0, 1 or 2, got {}",
                p.model_complexity
            )));
        }

        if self.box_padding_px < 0 {
            return Err(ConfigError::Invalid("boxPaddingPx must not be negative".into()));
        }
        if self.replay_frame_width == 0 || self.replay_frame_height == 0 || self.replay_fps == 0 {
            return Err(ConfigError::Invalid(
                "replay frame size and fps must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_seconds() {
        assert_eq!(IntervalPreset::FiveSeconds.seconds(), 5);
        assert_eq!(IntervalPreset::HalfHour.seconds(), 1800);
        assert_eq!(IntervalPreset::OneHour.seconds(), 3600);
        assert_eq!(IntervalPreset::HourAndHalf.seconds(), 5400);
        assert_eq!(IntervalPreset::TwoHours.seconds(), 7200);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("1.5h".parse::<IntervalPreset>().unwrap(), IntervalPreset::HourAndHalf);
        assert_eq!(" 30M ".parse::<IntervalPreset>().unwrap(), IntervalPreset::HalfHour);
        assert!("10m".parse::<IntervalPreset>().is_err());
    }

    #[test]
    fn test_threshold_override_from_json() {
        let config: Config = serde_json::from_str(
            r#"{ "forwardHeadAngleThresholdDeg": 150.0, "shoulderAsymmetryThresholdPx": 40, "intervalPreset": "1h" }"#,
        )
        .unwrap();

        assert_eq!(config.thresholds.forward_head_angle_threshold_deg, 150.0);
        assert_eq!(config.thresholds.shoulder_asymmetry_threshold_px, 40.0);
        assert_eq!(config.interval_preset, IntervalPreset::OneHour);
        // untouched fields keep their defaults
        assert_eq!(config.pose, PoseOptions::default());
        assert_eq!(config.camera_index, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.pose.min_detection_confidence = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.thresholds.shoulder_asymmetry_threshold_px = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pose.model_complexity = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("posture-guard-{}.json", std::process::id()));
        let mut config = Config::default();
        config.camera_index = 1;
        config.interval_preset = IntervalPreset::TwoHours;

        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
