use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical camera selection, independent of the physical device model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Front,
    #[default]
    Back,
}

impl DevicePosition {
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

impl fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => f.write_str("front"),
            Self::Back => f.write_str("back"),
        }
    }
}

/// Flash state of the active camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
}

impl FlashMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

/// Video stabilization requested for the recorded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilizationMode {
    Off,
    /// Let the hardware pick the strongest mode the active camera supports.
    #[default]
    Auto,
}

/// Capture quality preset requested from the hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
    Hd720,
    Hd1080,
}

/// Kind of media a device produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// Physical device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    WideAngle,
    UltraWide,
    Telephoto,
    Microphone,
}

/// A physical capture device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDeviceDescriptor {
    pub id: String,
    pub name: String,
    pub media: MediaKind,
    /// `None` for devices without a facing, such as microphones.
    pub position: Option<DevicePosition>,
    pub kind: DeviceKind,
    pub is_default: bool,
    pub has_flash: bool,
    pub presets: Vec<QualityPreset>,
}

impl CaptureDeviceDescriptor {
    pub fn supports(&self, preset: QualityPreset) -> bool {
        self.presets.contains(&preset)
    }
}

/// An input binding: a device opened at a given preset, ready to be attached
/// to a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub device: CaptureDeviceDescriptor,
    pub preset: QualityPreset,
}

impl DeviceInput {
    pub fn new(device: CaptureDeviceDescriptor, preset: QualityPreset) -> Self {
        Self { device, preset }
    }

    pub fn media(&self) -> MediaKind {
        self.device.media
    }
}
