use std::fs;
use std::path::{Path, PathBuf};

use capture_core::models::error::ExportError;
use capture_core::models::recording_result::RecordingMetadata;
use capture_core::storage::metadata::write_metadata;
use capture_core::traits::media_library::MediaLibrary;

/// A media library backed by a directory.
///
/// Each saved video is copied in under its own file name with a JSON
/// metadata sidecar beside it. The asset id is the recording's session id.
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an asset saved from `file` lives in the library.
    pub fn asset_path(&self, file: &Path) -> Option<PathBuf> {
        file.file_name().map(|name| self.root.join(name))
    }
}

impl MediaLibrary for DirectoryLibrary {
    fn save_video(&self, file: &Path, metadata: &RecordingMetadata) -> Result<String, ExportError> {
        let target = self
            .asset_path(file)
            .ok_or_else(|| ExportError::MissingFile(file.to_path_buf()))?;

        fs::create_dir_all(&self.root)
            .map_err(|e| ExportError::Io(format!("failed to create {}: {}", self.root.display(), e)))?;
        fs::copy(file, &target).map_err(|e| ExportError::Io(format!("failed to copy {}: {}", file.display(), e)))?;

        let mut stored = metadata.clone();
        stored.file_path = target.to_string_lossy().into_owned();
        write_metadata(&stored, &target)?;

        log::debug!("saved {} to library as {}", file.display(), target.display());
        Ok(metadata.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::models::device_models::{DevicePosition, QualityPreset};
    use capture_core::storage::metadata::read_metadata;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn copies_file_and_writes_sidecar() {
        let source = tempfile::tempdir().unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let file = source.path().join("recording_x.mov");
        fs::write(&file, b"frames").unwrap();
        let metadata = RecordingMetadata::new(
            Uuid::new_v4(),
            Duration::from_secs(4),
            &file.to_string_lossy(),
            "abc",
            DevicePosition::Back,
            QualityPreset::High,
            true,
        );

        let library = DirectoryLibrary::new(library_dir.path().join("videos"));
        let asset = library.save_video(&file, &metadata).unwrap();

        assert_eq!(asset, metadata.id);
        let copied = library.asset_path(&file).unwrap();
        assert_eq!(fs::read(&copied).unwrap(), b"frames");
        let stored = read_metadata(&copied).unwrap();
        assert_eq!(stored.checksum, "abc");
        assert_eq!(stored.file_path, copied.to_string_lossy());
    }

    #[test]
    fn missing_source_is_io_error() {
        let library_dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(library_dir.path());
        let metadata = RecordingMetadata::new(
            Uuid::new_v4(),
            Duration::from_secs(1),
            "/nowhere/recording.mov",
            "",
            DevicePosition::Front,
            QualityPreset::Low,
            false,
        );

        let err = library.save_video(Path::new("/nowhere/recording.mov"), &metadata).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
