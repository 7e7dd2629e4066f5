//! In-crate fakes for the platform traits, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::device_models::{
    CaptureDeviceDescriptor, DeviceInput, DeviceKind, DevicePosition, FlashMode, MediaKind, QualityPreset,
    StabilizationMode,
};
use crate::models::error::CaptureError;
use crate::models::permission::{PermissionResource, PermissionStatus};
use crate::models::recording_result::RecordingCompletion;
use crate::session::output_sink::{CompletionHandle, OutputSink};
use crate::traits::capture_hardware::CaptureHardware;
use crate::traits::hardware_session::HardwareSession;
use crate::traits::permission_provider::PermissionProvider;

#[derive(Default)]
struct FakeState {
    leased: bool,
    running: bool,
    attached: Vec<String>,
    rejected: HashSet<String>,
    fail_commits: u32,
    fail_adds: u32,
    fail_stops: u32,
    flash_changes: u32,
    torch: FlashMode,
    stabilization: Vec<StabilizationMode>,
    recordings_started: u32,
    hold_completions: bool,
    pending: Option<(CompletionHandle, PathBuf)>,
}

pub(crate) struct FakeRig {
    video: Vec<CaptureDeviceDescriptor>,
    audio: Vec<CaptureDeviceDescriptor>,
    state: Arc<Mutex<FakeState>>,
}

fn device(id: &str, media: MediaKind, position: Option<DevicePosition>, has_flash: bool) -> CaptureDeviceDescriptor {
    CaptureDeviceDescriptor {
        id: id.into(),
        name: id.into(),
        media,
        position,
        kind: if media == MediaKind::Audio {
            DeviceKind::Microphone
        } else {
            DeviceKind::WideAngle
        },
        is_default: true,
        has_flash,
        presets: vec![QualityPreset::High, QualityPreset::Hd720],
    }
}

impl FakeRig {
    pub fn phone() -> Arc<Self> {
        Self::with(vec![
            device("back-wide", MediaKind::Video, Some(DevicePosition::Back), true),
            device("front-wide", MediaKind::Video, Some(DevicePosition::Front), false),
        ])
    }

    pub fn back_only() -> Arc<Self> {
        Self::with(vec![device("back-wide", MediaKind::Video, Some(DevicePosition::Back), true)])
    }

    fn with(video: Vec<CaptureDeviceDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            video,
            audio: vec![device("mic", MediaKind::Audio, None, false)],
            state: Arc::new(Mutex::new(FakeState::default())),
        })
    }

    pub fn is_leased(&self) -> bool {
        self.state.lock().leased
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn attached(&self) -> Vec<String> {
        self.state.lock().attached.clone()
    }

    pub fn reject_input(&self, id: &str) {
        self.state.lock().rejected.insert(id.to_string());
    }

    pub fn fail_next_commit(&self) {
        self.state.lock().fail_commits += 1;
    }

    /// The next `add_input` fails after `can_add_input` accepted it.
    pub fn fail_next_add(&self) {
        self.state.lock().fail_adds += 1;
    }

    /// The next `stop_recording` is refused; the recording stays pending.
    pub fn fail_next_stop(&self) {
        self.state.lock().fail_stops += 1;
    }

    pub fn torch(&self) -> FlashMode {
        self.state.lock().torch
    }

    /// Every stabilization request, in order.
    pub fn stabilization(&self) -> Vec<StabilizationMode> {
        self.state.lock().stabilization.clone()
    }

    pub fn flash_changes(&self) -> u32 {
        self.state.lock().flash_changes
    }

    pub fn recordings_started(&self) -> u32 {
        self.state.lock().recordings_started
    }

    /// Keep completions pending after `stop_recording` until `finish_pending`.
    pub fn hold_completions(&self) {
        self.state.lock().hold_completions = true;
    }

    /// Resolve the in-flight recording, as the hardware would from its own thread.
    pub fn finish_pending(&self, completion: RecordingCompletion) -> bool {
        let pending = self.state.lock().pending.take();
        match pending {
            Some((handle, _)) => handle.resolve(completion),
            None => false,
        }
    }

    pub fn pending_file(&self) -> Option<PathBuf> {
        self.state.lock().pending.as_ref().map(|(_, file)| file.clone())
    }

    /// A free-standing completion handle for driving `CaptureSession` directly.
    pub fn arm_completion(&self) -> CompletionHandle {
        let mut sink = OutputSink::new();
        let path = std::env::temp_dir().join("fake_rig_unused.mov");
        match sink.arm(Uuid::new_v4(), &path) {
            Ok(handle) => handle,
            Err(e) => panic!("fresh sink refused to arm: {}", e),
        }
    }
}

impl CaptureHardware for FakeRig {
    fn video_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.video.clone()
    }

    fn audio_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.audio.clone()
    }

    fn open_session(&self, _preset: QualityPreset) -> Result<Box<dyn HardwareSession>, CaptureError> {
        let mut state = self.state.lock();
        if state.leased {
            return Err(CaptureError::DeviceBusy);
        }
        state.leased = true;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl HardwareSession for FakeSession {
    fn begin_configuration(&mut self) {}

    fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if state.fail_commits > 0 {
            state.fail_commits -= 1;
            return Err(CaptureError::ConfigurationFailed("commit refused".into()));
        }
        Ok(())
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        !self.state.lock().rejected.contains(&input.device.id)
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if state.fail_adds > 0 {
            state.fail_adds -= 1;
            return Err(CaptureError::ConfigurationFailed(format!("{} went away", input.device.id)));
        }
        state.attached.push(input.device.id.clone());
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        self.state.lock().attached.retain(|id| id != &input.device.id);
    }

    fn start_running(&mut self) -> Result<(), CaptureError> {
        self.state.lock().running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        self.state.lock().running = false;
    }

    fn set_flash_mode(&mut self, _device: &CaptureDeviceDescriptor, mode: FlashMode) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        state.flash_changes += 1;
        state.torch = mode;
        Ok(())
    }

    fn set_video_stabilization(&mut self, mode: StabilizationMode) -> Result<(), CaptureError> {
        self.state.lock().stabilization.push(mode);
        Ok(())
    }

    fn start_recording(&mut self, file: &Path, completion: CompletionHandle) -> Result<(), CaptureError> {
        fs::write(file, b"fake container").map_err(|e| CaptureError::RecordingFailed {
            reason: e.to_string(),
            partial_file: None,
        })?;
        let mut state = self.state.lock();
        state.recordings_started += 1;
        state.pending = Some((completion, file.to_path_buf()));
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        let pending = {
            let mut state = self.state.lock();
            if state.fail_stops > 0 {
                state.fail_stops -= 1;
                return Err(CaptureError::RecordingFailed {
                    reason: "encoder wedged".into(),
                    partial_file: None,
                });
            }
            if state.hold_completions {
                None
            } else {
                state.pending.take()
            }
        };
        if let Some((handle, file)) = pending {
            handle.resolve(RecordingCompletion::Finished { file });
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.leased = false;
        state.running = false;
    }
}

pub(crate) struct FakePermissions {
    statuses: Mutex<HashMap<PermissionResource, PermissionStatus>>,
}

impl FakePermissions {
    pub fn granting_all() -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(HashMap::new()),
        })
    }

    pub fn denying(resource: PermissionResource) -> Arc<Self> {
        let permissions = Self::granting_all();
        permissions.statuses.lock().insert(resource, PermissionStatus::Denied);
        permissions
    }
}

#[async_trait]
impl PermissionProvider for FakePermissions {
    fn authorization_status(&self, resource: PermissionResource) -> PermissionStatus {
        self.statuses.lock().get(&resource).copied().unwrap_or_default()
    }

    async fn request_access(&self, resource: PermissionResource) -> PermissionStatus {
        *self
            .statuses
            .lock()
            .entry(resource)
            .or_insert(PermissionStatus::Granted)
    }
}
