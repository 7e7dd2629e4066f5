use std::sync::Arc;

use crate::models::device_models::{
    CaptureDeviceDescriptor, DeviceInput, DeviceKind, DevicePosition, QualityPreset,
};
use crate::models::error::CaptureError;
use crate::traits::capture_hardware::CaptureHardware;

/// Picks physical devices for a logical camera position.
///
/// Position is a user-facing contract: if nothing suitable faces the
/// requested way, selection fails instead of substituting the other camera.
#[derive(Clone)]
pub struct DeviceNegotiator {
    hardware: Arc<dyn CaptureHardware>,
}

impl DeviceNegotiator {
    pub fn new(hardware: Arc<dyn CaptureHardware>) -> Self {
        Self { hardware }
    }

    /// Cameras facing `position`.
    pub fn devices(&self, position: DevicePosition) -> Vec<CaptureDeviceDescriptor> {
        self.hardware
            .video_devices()
            .into_iter()
            .filter(|d| d.position == Some(position))
            .collect()
    }

    /// Select the camera for `position` that supports `preset`.
    ///
    /// Prefers the wide-angle camera, then the platform default for that
    /// position. Anything else (a lone telephoto, say) is not picked.
    pub fn select(
        &self,
        position: DevicePosition,
        preset: QualityPreset,
    ) -> Result<CaptureDeviceDescriptor, CaptureError> {
        let candidates: Vec<_> = self
            .devices(position)
            .into_iter()
            .filter(|d| d.supports(preset))
            .collect();

        let chosen = candidates
            .iter()
            .find(|d| d.kind == DeviceKind::WideAngle)
            .or_else(|| candidates.iter().find(|d| d.is_default))
            .cloned()
            .ok_or(CaptureError::DeviceUnavailable(position))?;

        log::debug!("selected {} camera {} ({})", position, chosen.name, chosen.id);
        Ok(chosen)
    }

    /// The microphone to record with: the default one, else the first found.
    pub fn select_audio(&self) -> Option<CaptureDeviceDescriptor> {
        let devices = self.hardware.audio_devices();
        devices
            .iter()
            .find(|d| d.is_default)
            .or_else(|| devices.first())
            .cloned()
    }

    /// Negotiate the camera for `position` and bind it as an input.
    pub fn video_input(
        &self,
        position: DevicePosition,
        preset: QualityPreset,
    ) -> Result<DeviceInput, CaptureError> {
        Ok(DeviceInput::new(self.select(position, preset)?, preset))
    }

    pub fn audio_input(&self, preset: QualityPreset) -> Option<DeviceInput> {
        self.select_audio().map(|mic| DeviceInput::new(mic, preset))
    }
}
