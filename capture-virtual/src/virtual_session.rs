use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use capture_core::models::device_models::{
    CaptureDeviceDescriptor, DeviceInput, FlashMode, QualityPreset, StabilizationMode,
};
use capture_core::models::error::CaptureError;
use capture_core::session::output_sink::CompletionHandle;
use capture_core::traits::hardware_session::HardwareSession;

use crate::device_enumerator::DeviceEnumerator;
use crate::frame_recorder::FrameRecorder;
use crate::rig::RigState;

/// An open session on a `VirtualCameraRig`. Holds the rig's lease until dropped.
///
/// Enforces the hardware rules strictly: inputs only change inside a
/// configuration block, one input per media kind, and no recording starts
/// while a block is open.
pub struct VirtualSession {
    devices: DeviceEnumerator,
    preset: QualityPreset,
    frame_interval: Duration,
    rig: Arc<RigState>,
    configuring: bool,
    inputs: Vec<DeviceInput>,
    running: bool,
    recorder: Option<FrameRecorder>,
}

impl VirtualSession {
    pub(crate) fn new(
        devices: DeviceEnumerator,
        preset: QualityPreset,
        frame_interval: Duration,
        rig: Arc<RigState>,
    ) -> Self {
        Self {
            devices,
            preset,
            frame_interval,
            rig,
            configuring: false,
            inputs: Vec::new(),
            running: false,
            recorder: None,
        }
    }

    fn input_ids(&self) -> Vec<String> {
        self.inputs.iter().map(|i| i.device.id.clone()).collect()
    }
}

impl HardwareSession for VirtualSession {
    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        self.configuring = false;
        if self.rig.take_commit_failure() {
            return Err(CaptureError::ConfigurationFailed("virtual rig refused the commit".into()));
        }
        self.rig.committed(self.input_ids());
        Ok(())
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let known = self
            .devices
            .find(&input.device.id)
            .is_some_and(|d| d.supports(input.preset) && d.media == input.media());
        known
            && input.preset == self.preset
            && !self.rig.is_rejected(&input.device.id)
            && !self.inputs.iter().any(|i| i.media() == input.media())
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CaptureError> {
        if !self.configuring {
            return Err(CaptureError::ConfigurationFailed(
                "inputs can only change inside a configuration block".into(),
            ));
        }
        if !self.can_add_input(input) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "cannot add input {}",
                input.device.id
            )));
        }
        self.inputs.push(input.clone());
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        self.inputs.retain(|i| i.device.id != input.device.id);
    }

    fn start_running(&mut self) -> Result<(), CaptureError> {
        if !self.inputs.iter().any(|i| i.device.position.is_some()) {
            return Err(CaptureError::ConfigurationFailed("no camera attached".into()));
        }
        self.running = true;
        self.rig.set_preview(true);
        Ok(())
    }

    fn stop_running(&mut self) {
        self.running = false;
        self.rig.set_preview(false);
    }

    fn set_flash_mode(&mut self, device: &CaptureDeviceDescriptor, mode: FlashMode) -> Result<(), CaptureError> {
        if !device.has_flash {
            return Err(CaptureError::ConfigurationFailed(format!("{} has no flash", device.name)));
        }
        self.rig.set_torch(mode);
        Ok(())
    }

    fn set_video_stabilization(&mut self, mode: StabilizationMode) -> Result<(), CaptureError> {
        if !self.inputs.iter().any(|i| i.device.position.is_some()) {
            return Err(CaptureError::ConfigurationFailed(
                "no video connection to stabilize".into(),
            ));
        }
        self.rig.set_stabilization(mode);
        Ok(())
    }

    fn start_recording(&mut self, file: &Path, completion: CompletionHandle) -> Result<(), CaptureError> {
        if self.configuring {
            return Err(CaptureError::ConfigurationFailed(
                "recording cannot start inside a configuration block".into(),
            ));
        }
        if !self.running {
            return Err(CaptureError::ConfigurationFailed("preview is not running".into()));
        }
        if self.recorder.as_ref().is_some_and(|r| r.is_running()) {
            return Err(CaptureError::InvalidState("recording"));
        }

        // A recorder that ended on its own (write error) is joined here.
        self.recorder = None;
        self.recorder = Some(FrameRecorder::start(
            file,
            self.frame_interval,
            completion,
            Arc::clone(&self.rig),
        )?);
        self.rig.recording_started();
        log::debug!("virtual recording to {}", file.display());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        if let Some(recorder) = self.recorder.as_ref() {
            recorder.request_stop();
        }
        Ok(())
    }
}

impl Drop for VirtualSession {
    fn drop(&mut self) {
        self.recorder = None;
        self.rig.release();
        log::debug!("virtual rig lease released");
    }
}
