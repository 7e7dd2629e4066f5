//! Virtual device enumeration.
//!
//! Stands in for the platform's device discovery: a fixed list of cameras and
//! microphones, each with a position, flash capability and supported presets.

use capture_core::models::device_models::{
    CaptureDeviceDescriptor, DeviceKind, DevicePosition, MediaKind, QualityPreset,
};

const ALL_PRESETS: [QualityPreset; 5] = [
    QualityPreset::Low,
    QualityPreset::Medium,
    QualityPreset::High,
    QualityPreset::Hd720,
    QualityPreset::Hd1080,
];

/// Lists the devices attached to a virtual rig.
#[derive(Debug, Clone, Default)]
pub struct DeviceEnumerator {
    devices: Vec<CaptureDeviceDescriptor>,
}

impl DeviceEnumerator {
    /// Typical phone layout: back wide-angle with flash, back ultra-wide,
    /// front wide-angle, built-in microphone.
    pub fn phone() -> Self {
        Self::default()
            .with_camera("back-wide", "Back Camera", DevicePosition::Back, DeviceKind::WideAngle, true)
            .with_camera("back-ultra", "Back Ultra Wide Camera", DevicePosition::Back, DeviceKind::UltraWide, false)
            .with_camera("front-wide", "Front Camera", DevicePosition::Front, DeviceKind::WideAngle, false)
            .with_microphone("builtin-mic", "Built-in Microphone")
    }

    /// A webcam-style rig: a single front camera and a microphone.
    pub fn webcam() -> Self {
        Self::default()
            .with_camera("webcam", "USB Camera", DevicePosition::Front, DeviceKind::WideAngle, false)
            .with_microphone("webcam-mic", "USB Microphone")
    }

    /// Add a camera. The first camera added for a position is its default.
    pub fn with_camera(
        mut self,
        id: &str,
        name: &str,
        position: DevicePosition,
        kind: DeviceKind,
        has_flash: bool,
    ) -> Self {
        let is_default = !self
            .devices
            .iter()
            .any(|d| d.media == MediaKind::Video && d.position == Some(position));
        self.devices.push(CaptureDeviceDescriptor {
            id: id.into(),
            name: name.into(),
            media: MediaKind::Video,
            position: Some(position),
            kind,
            is_default,
            has_flash,
            presets: ALL_PRESETS.to_vec(),
        });
        self
    }

    /// Add a microphone. The first one added is the default.
    pub fn with_microphone(mut self, id: &str, name: &str) -> Self {
        let is_default = self.list_audio_devices().is_empty();
        self.devices.push(CaptureDeviceDescriptor {
            id: id.into(),
            name: name.into(),
            media: MediaKind::Audio,
            position: None,
            kind: DeviceKind::Microphone,
            is_default,
            has_flash: false,
            presets: ALL_PRESETS.to_vec(),
        });
        self
    }

    /// Restrict a device to the given presets.
    pub fn with_presets(mut self, id: &str, presets: &[QualityPreset]) -> Self {
        if let Some(device) = self.devices.iter_mut().find(|d| d.id == id) {
            device.presets = presets.to_vec();
        }
        self
    }

    pub fn list_video_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.list(MediaKind::Video)
    }

    pub fn list_audio_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.list(MediaKind::Audio)
    }

    /// Id of the default camera for `position`, if there is one.
    pub fn default_video_device_id(&self, position: DevicePosition) -> Option<String> {
        self.devices
            .iter()
            .find(|d| d.media == MediaKind::Video && d.position == Some(position) && d.is_default)
            .map(|d| d.id.clone())
    }

    pub fn find(&self, id: &str) -> Option<&CaptureDeviceDescriptor> {
        self.devices.iter().find(|d| d.id == id)
    }

    fn list(&self, media: MediaKind) -> Vec<CaptureDeviceDescriptor> {
        self.devices.iter().filter(|d| d.media == media).cloned().collect()
    }
}
