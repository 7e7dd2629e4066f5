use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::ExportError;
use crate::models::recording_result::RecordingMetadata;
use crate::storage::output_path::metadata_path;

/// Write recording metadata as a JSON sidecar next to the recording.
///
/// Returns the sidecar path.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, ExportError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| ExportError::Io(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json).map_err(|e| ExportError::Io(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from its JSON sidecar.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, ExportError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path).map_err(|e| ExportError::Io(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| ExportError::Io(format!("failed to parse metadata: {}", e)))
}
