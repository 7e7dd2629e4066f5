//! Virtual camera rig: the `CaptureHardware` of the software backend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use capture_core::models::device_models::{CaptureDeviceDescriptor, FlashMode, QualityPreset, StabilizationMode};
use capture_core::models::error::CaptureError;
use capture_core::models::recording_result::RecordingCompletion;
use capture_core::session::output_sink::CompletionHandle;
use capture_core::traits::capture_hardware::CaptureHardware;
use capture_core::traits::hardware_session::HardwareSession;

use crate::device_enumerator::DeviceEnumerator;
use crate::virtual_session::VirtualSession;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Counters and live state of a rig, for inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigStats {
    pub sessions_opened: u32,
    pub recordings_started: u32,
    pub frames_written: u64,
    pub leased: bool,
    pub preview_running: bool,
    /// Committed input device ids.
    pub attached: Vec<String>,
    pub torch: FlashMode,
    /// Stabilization on the recording connection; `None` until a camera asks for it.
    pub stabilization: Option<StabilizationMode>,
}

#[derive(Default)]
struct RigInner {
    leased: bool,
    preview_running: bool,
    attached: Vec<String>,
    torch: FlashMode,
    stabilization: Option<StabilizationMode>,
    sessions_opened: u32,
    recordings_started: u32,
    rejected: HashSet<String>,
    failing_commits: u32,
    fail_after_frames: Option<u64>,
    hold_completions: bool,
    held: Vec<(CompletionHandle, RecordingCompletion)>,
}

/// State shared between the rig, its open session and the recorder thread.
#[derive(Default)]
pub struct RigState {
    inner: Mutex<RigInner>,
    frames_written: AtomicU64,
}

impl RigState {
    /// Deliver a recording outcome, or park it while completions are held.
    pub(crate) fn report(&self, completion: CompletionHandle, outcome: RecordingCompletion) {
        let mut inner = self.inner.lock();
        if inner.hold_completions {
            inner.held.push((completion, outcome));
            return;
        }
        drop(inner);
        if !completion.resolve(outcome) {
            log::debug!("recording {} completion was already resolved", completion.session_id());
        }
    }

    pub(crate) fn write_should_fail(&self, frames_written: u64) -> bool {
        self.inner
            .lock()
            .fail_after_frames
            .is_some_and(|limit| frames_written >= limit)
    }

    pub(crate) fn frame_written(&self) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn is_rejected(&self, id: &str) -> bool {
        self.inner.lock().rejected.contains(id)
    }

    pub(crate) fn take_commit_failure(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.failing_commits == 0 {
            return false;
        }
        inner.failing_commits -= 1;
        true
    }

    pub(crate) fn committed(&self, attached: Vec<String>) {
        self.inner.lock().attached = attached;
    }

    pub(crate) fn set_preview(&self, running: bool) {
        self.inner.lock().preview_running = running;
    }

    pub(crate) fn set_torch(&self, mode: FlashMode) {
        self.inner.lock().torch = mode;
    }

    pub(crate) fn set_stabilization(&self, mode: StabilizationMode) {
        self.inner.lock().stabilization = Some(mode);
    }

    pub(crate) fn recording_started(&self) {
        self.inner.lock().recordings_started += 1;
    }

    pub(crate) fn release(&self) {
        let mut inner = self.inner.lock();
        inner.leased = false;
        inner.preview_running = false;
        inner.attached.clear();
        inner.torch = FlashMode::Off;
        inner.stabilization = None;
    }
}

/// Software camera hardware with an exclusive lease.
///
/// Only one session may be open at a time; a second `open_session` fails with
/// `DeviceBusy` until the first session is dropped. Failure knobs let callers
/// script rejected inputs, failing commits and write errors.
pub struct VirtualCameraRig {
    devices: DeviceEnumerator,
    frame_interval: Duration,
    state: Arc<RigState>,
}

impl VirtualCameraRig {
    pub fn new(devices: DeviceEnumerator) -> Self {
        Self {
            devices,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            state: Arc::new(RigState::default()),
        }
    }

    pub fn phone() -> Self {
        Self::new(DeviceEnumerator::phone())
    }

    /// Real time between written frames.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn devices(&self) -> &DeviceEnumerator {
        &self.devices
    }

    /// Refuse `id` as a session input from now on.
    pub fn reject_input(&self, id: &str) {
        self.state.inner.lock().rejected.insert(id.to_string());
    }

    /// Make the next configuration commit fail.
    pub fn fail_next_commit(&self) {
        self.state.inner.lock().failing_commits += 1;
    }

    /// Fail every recording with a write error once it has written `frames` frames.
    pub fn fail_recording_after(&self, frames: u64) {
        self.state.inner.lock().fail_after_frames = Some(frames);
    }

    /// Keep recording outcomes back until `release_held`.
    pub fn hold_completions(&self) {
        self.state.inner.lock().hold_completions = true;
    }

    /// Deliver every held outcome and stop holding. Returns how many of them
    /// were still awaited.
    pub fn release_held(&self) -> usize {
        let held = {
            let mut inner = self.state.inner.lock();
            inner.hold_completions = false;
            std::mem::take(&mut inner.held)
        };
        held.into_iter()
            .filter(|(handle, outcome)| handle.resolve(outcome.clone()))
            .count()
    }

    pub fn is_leased(&self) -> bool {
        self.state.inner.lock().leased
    }

    pub fn stats(&self) -> RigStats {
        let inner = self.state.inner.lock();
        RigStats {
            sessions_opened: inner.sessions_opened,
            recordings_started: inner.recordings_started,
            frames_written: self.state.frames_written.load(Ordering::Relaxed),
            leased: inner.leased,
            preview_running: inner.preview_running,
            attached: inner.attached.clone(),
            torch: inner.torch,
            stabilization: inner.stabilization,
        }
    }
}

impl CaptureHardware for VirtualCameraRig {
    fn video_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.devices.list_video_devices()
    }

    fn audio_devices(&self) -> Vec<CaptureDeviceDescriptor> {
        self.devices.list_audio_devices()
    }

    fn open_session(&self, preset: QualityPreset) -> Result<Box<dyn HardwareSession>, CaptureError> {
        {
            let mut inner = self.state.inner.lock();
            if inner.leased {
                return Err(CaptureError::DeviceBusy);
            }
            inner.leased = true;
            inner.sessions_opened += 1;
        }
        log::debug!("virtual rig leased at {:?}", preset);
        Ok(Box::new(VirtualSession::new(
            self.devices.clone(),
            preset,
            self.frame_interval,
            Arc::clone(&self.state),
        )))
    }
}
