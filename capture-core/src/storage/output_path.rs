use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Path of the container file for a recording session: `recording_<id>.<ext>`.
///
/// Session ids are unique, so two sessions never share a file.
pub fn recording_path(directory: &Path, session_id: Uuid, extension: &str) -> PathBuf {
    directory.join(format!("recording_{}.{}", session_id.simple(), extension))
}

/// Sidecar path for a recording's JSON metadata.
pub fn metadata_path(recording: &Path) -> PathBuf {
    recording.with_extension("metadata.json")
}
