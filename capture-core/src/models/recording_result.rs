use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device_models::{DevicePosition, QualityPreset};
use super::error::CaptureError;

/// Terminal outcome of a recording session.
pub type RecordingResult = Result<RecordedMedia, CaptureError>;

/// What the hardware reports when a recording ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingCompletion {
    /// The container file was written and closed.
    Finished { file: PathBuf },
    /// Writing failed; whatever reached the disk is left in place.
    Failed {
        reason: String,
        partial_file: Option<PathBuf>,
    },
    /// The wait was abandoned by teardown.
    Cancelled,
}

/// A finished recording handed to the caller: a closed file plus its duration.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMedia {
    pub session_id: Uuid,
    pub file_path: PathBuf,
    pub duration: Duration,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside an exported recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub created_at: String,
    pub position: DevicePosition,
    pub preset: QualityPreset,
    pub has_audio: bool,
}

impl RecordingMetadata {
    pub fn new(
        session_id: Uuid,
        duration: Duration,
        file_path: &str,
        checksum: &str,
        position: DevicePosition,
        preset: QualityPreset,
        has_audio: bool,
    ) -> Self {
        Self {
            id: session_id.to_string(),
            duration_secs: duration.as_secs_f64(),
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            position,
            preset,
            has_audio,
        }
    }
}
