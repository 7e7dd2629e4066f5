use crate::models::device_models::{CaptureDeviceDescriptor, QualityPreset};
use crate::models::error::CaptureError;

use super::hardware_session::HardwareSession;

/// Platform capture hardware: device enumeration and exclusive session access.
///
/// Implemented by:
/// - `VirtualCameraRig` (capture-virtual)
pub trait CaptureHardware: Send + Sync {
    /// Cameras currently attached, in platform order.
    fn video_devices(&self) -> Vec<CaptureDeviceDescriptor>;

    /// Microphones currently attached, in platform order.
    fn audio_devices(&self) -> Vec<CaptureDeviceDescriptor>;

    /// Acquire the camera/microphone hardware and open a session on it.
    ///
    /// Fails with `DeviceBusy` while another session holds the hardware.
    /// The hardware is released when the returned session is dropped.
    fn open_session(&self, preset: QualityPreset) -> Result<Box<dyn HardwareSession>, CaptureError>;
}
