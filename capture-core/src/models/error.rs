use std::path::PathBuf;

use thiserror::Error;

use super::device_models::DevicePosition;
use super::permission::PermissionResource;

/// Errors raised by the capture core.
///
/// Every `Failed` controller state carries one of these, so the UI can pick
/// the right recovery action (re-request permission, retry, abandon).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0} permission denied")]
    PermissionDenied(PermissionResource),

    #[error("no {0} camera available")]
    DeviceUnavailable(DevicePosition),

    #[error("capture hardware is held by another session")]
    DeviceBusy,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    /// The hardware reported an error while writing. The partially written
    /// file, when one exists, is kept on disk and surfaced here.
    #[error("recording failed: {reason}")]
    RecordingFailed {
        reason: String,
        partial_file: Option<PathBuf>,
    },

    #[error("operation not allowed while {0}")]
    InvalidState(&'static str),

    #[error("cancelled")]
    Cancelled,

    #[error("controller is shut down")]
    ControllerClosed,
}

impl CaptureError {
    pub fn partial_file(&self) -> Option<&PathBuf> {
        match self {
            Self::RecordingFailed { partial_file, .. } => partial_file.as_ref(),
            _ => None,
        }
    }
}

/// Errors raised while persisting a finished recording to durable storage.
///
/// Kept apart from `CaptureError`: the media-library gate is only consulted
/// after capture has finished.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("media library permission denied")]
    PermissionDenied,

    #[error("recording file missing: {0}")]
    MissingFile(PathBuf),

    #[error("export i/o failed: {0}")]
    Io(String),
}
