//! Error types shared across the capture, notification and configuration layers.

use thiserror::Error;

/// Failures at the frame-source boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The device could not be opened. The capture loop never starts.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The source has no more frames.
    #[error("end of stream")]
    EndOfStream,

    /// A frame could not be read mid-run.
    #[error("frame read failed: {0}")]
    ReadFailure(String),

    /// The background worker could not hand its resources back.
    #[error("capture worker failed: {0}")]
    Worker(String),
}

/// Failures of a notification sink. Logged and swallowed by the caller.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The sink does not exist on this platform or session.
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),

    /// The sink exists but refused or failed the delivery.
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
