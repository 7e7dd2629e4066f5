use std::path::Path;

use crate::models::error::ExportError;
use crate::models::recording_result::RecordingMetadata;

/// Durable media storage (the user's photo/video library).
pub trait MediaLibrary: Send + Sync {
    /// Persist the closed recording at `file`. Returns the library's asset id.
    fn save_video(&self, file: &Path, metadata: &RecordingMetadata) -> Result<String, ExportError>;
}
