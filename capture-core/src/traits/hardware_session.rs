use std::path::Path;

use crate::models::device_models::{CaptureDeviceDescriptor, DeviceInput, FlashMode, StabilizationMode};
use crate::models::error::CaptureError;
use crate::session::output_sink::CompletionHandle;

/// A live binding between the capture hardware and the recording pipeline.
///
/// Low-level and unguarded: the core only drives it through `CaptureSession`,
/// which brackets input changes in transactions and tracks what is attached.
pub trait HardwareSession: Send {
    fn begin_configuration(&mut self);

    /// Apply every change made since `begin_configuration`.
    fn commit_configuration(&mut self) -> Result<(), CaptureError>;

    /// Whether the session would accept `input` (format, resource limits).
    fn can_add_input(&self, input: &DeviceInput) -> bool;

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CaptureError>;

    fn remove_input(&mut self, input: &DeviceInput);

    /// Start frame delivery to the preview.
    fn start_running(&mut self) -> Result<(), CaptureError>;

    fn stop_running(&mut self);

    /// Lock `device` for configuration and set its flash mode.
    fn set_flash_mode(&mut self, device: &CaptureDeviceDescriptor, mode: FlashMode) -> Result<(), CaptureError>;

    /// Set stabilization on the recording output's video connection. Needs a
    /// camera attached.
    fn set_video_stabilization(&mut self, mode: StabilizationMode) -> Result<(), CaptureError>;

    /// Begin writing to `file`. When the recording ends, for whatever reason,
    /// the hardware resolves `completion` exactly once, from any thread.
    fn start_recording(&mut self, file: &Path, completion: CompletionHandle) -> Result<(), CaptureError>;

    /// Ask the hardware to stop. Completion is still reported through the
    /// handle passed to `start_recording`.
    fn stop_recording(&mut self) -> Result<(), CaptureError>;
}
