use std::sync::Arc;

use crate::models::error::ExportError;
use crate::models::permission::{PermissionResource, PermissionStatus};
use crate::models::recording_result::RecordedMedia;
use crate::permissions::gate::PermissionGate;
use crate::traits::media_library::MediaLibrary;

/// Persists finished recordings to the media library.
///
/// Gated on `MediaLibrary` permission only, checked when saving. A recording
/// can therefore succeed and still fail to export; the caller keeps the file
/// and decides what to do.
pub struct ExportGateway {
    gate: Arc<PermissionGate>,
    library: Arc<dyn MediaLibrary>,
}

impl ExportGateway {
    pub fn new(gate: Arc<PermissionGate>, library: Arc<dyn MediaLibrary>) -> Self {
        Self { gate, library }
    }

    /// Save `media` to the library and return the library's asset id.
    pub async fn export(&self, media: &RecordedMedia) -> Result<String, ExportError> {
        if self.gate.request(PermissionResource::MediaLibrary).await != PermissionStatus::Granted {
            log::warn!("media library access denied, {} not exported", media.file_path.display());
            return Err(ExportError::PermissionDenied);
        }
        if !media.file_path.is_file() {
            return Err(ExportError::MissingFile(media.file_path.clone()));
        }

        let library = Arc::clone(&self.library);
        let file = media.file_path.clone();
        let metadata = media.metadata.clone();
        let asset = tokio::task::spawn_blocking(move || library.save_video(&file, &metadata))
            .await
            .map_err(|e| ExportError::Io(format!("export task failed: {}", e)))??;

        log::info!("exported {} as {}", media.file_path.display(), asset);
        Ok(asset)
    }
}
