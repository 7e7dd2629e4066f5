use std::path::Path;

use crate::models::device_models::{DeviceInput, DevicePosition, FlashMode, MediaKind, QualityPreset, StabilizationMode};
use crate::models::error::CaptureError;
use crate::session::negotiator::DeviceNegotiator;
use crate::session::output_sink::CompletionHandle;
use crate::traits::capture_hardware::CaptureHardware;
use crate::traits::hardware_session::HardwareSession;

/// Owns the live hardware session and mediates every mutation of it.
///
/// Inputs change only inside a `ConfigurationTransaction`, which holds the
/// session mutably: nothing can start recording while one is open, and a
/// transaction that is not committed rolls back when dropped.
///
/// Dropping the session stops any recording, stops frame delivery and
/// releases the hardware.
pub struct CaptureSession {
    hardware: Box<dyn HardwareSession>,
    preset: QualityPreset,
    video: Option<DeviceInput>,
    audio: Option<DeviceInput>,
    flash_mode: FlashMode,
    stabilization: StabilizationMode,
    running: bool,
    recording: bool,
}

impl CaptureSession {
    /// Acquire the hardware. Fails with `DeviceBusy` if another session holds it.
    pub fn open(hardware: &dyn CaptureHardware, preset: QualityPreset) -> Result<Self, CaptureError> {
        let session = hardware.open_session(preset)?;
        log::info!("capture hardware acquired ({:?})", preset);
        Ok(Self {
            hardware: session,
            preset,
            video: None,
            audio: None,
            flash_mode: FlashMode::Off,
            stabilization: StabilizationMode::Off,
            running: false,
            recording: false,
        })
    }

    pub fn audio_input(&self) -> Option<&DeviceInput> {
        self.audio.as_ref()
    }

    pub fn has_video_input(&self) -> bool {
        self.video.is_some()
    }

    pub fn position(&self) -> Option<DevicePosition> {
        self.video.as_ref().and_then(|v| v.device.position)
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.flash_mode
    }

    pub fn stabilization(&self) -> StabilizationMode {
        self.stabilization
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Open a configuration transaction. Refused while a recording is active.
    pub fn begin_configuration(&mut self) -> Result<ConfigurationTransaction<'_>, CaptureError> {
        if self.recording {
            return Err(CaptureError::ConfigurationFailed(
                "cannot reconfigure while recording".into(),
            ));
        }
        self.hardware.begin_configuration();
        Ok(ConfigurationTransaction {
            session: self,
            journal: Vec::new(),
            poisoned: None,
            open: true,
        })
    }

    /// Switch cameras in one transaction: remove the current inputs, negotiate
    /// the camera for `to`, attach it and the microphone again.
    ///
    /// If negotiation or attachment fails, the previous inputs are restored.
    /// The outgoing camera's flash is switched off first; the session reports
    /// `FlashMode::Off` afterwards whether or not the flip succeeds.
    pub fn flip(&mut self, to: DevicePosition, negotiator: &DeviceNegotiator) -> Result<(), CaptureError> {
        self.flash_off();
        let preset = self.preset;
        let mut tx = self.begin_configuration()?;
        let audio = tx.detach(MediaKind::Audio);
        tx.detach(MediaKind::Video);

        tx.attach(negotiator.video_input(to, preset)?)?;
        if let Some(audio) = audio {
            tx.attach(audio)?;
        }
        tx.commit()?;

        // Stabilization is set per camera connection.
        if let Err(e) = self.apply_stabilization() {
            log::warn!("could not re-apply stabilization after flip: {}", e);
        }
        log::info!("flipped to {} camera", to);
        Ok(())
    }

    /// Set the flash on the current camera. Returns the mode now in effect.
    ///
    /// Only a back camera with a flash unit is touched; for anything else this
    /// is a silent no-op.
    pub fn set_flash_mode(&mut self, mode: FlashMode) -> Result<FlashMode, CaptureError> {
        let Some(video) = self.video.as_ref() else {
            return Ok(self.flash_mode);
        };
        if video.device.position != Some(DevicePosition::Back) || !video.device.has_flash {
            log::debug!("{} has no usable flash, ignoring {:?}", video.device.name, mode);
            return Ok(self.flash_mode);
        }
        if mode == self.flash_mode {
            return Ok(mode);
        }

        self.hardware.set_flash_mode(&video.device, mode)?;
        self.flash_mode = mode;
        Ok(mode)
    }

    /// Request video stabilization for recordings. Takes effect once a camera
    /// is attached and follows the camera across flips.
    pub fn set_stabilization(&mut self, mode: StabilizationMode) -> Result<(), CaptureError> {
        self.stabilization = mode;
        self.apply_stabilization()
    }

    fn apply_stabilization(&mut self) -> Result<(), CaptureError> {
        if self.video.is_none() {
            return Ok(());
        }
        self.hardware.set_video_stabilization(self.stabilization)
    }

    fn flash_off(&mut self) {
        if self.flash_mode == FlashMode::Off {
            return;
        }
        if let Some(video) = self.video.as_ref() {
            if let Err(e) = self.hardware.set_flash_mode(&video.device, FlashMode::Off) {
                log::warn!("could not switch off flash on {}: {}", video.device.name, e);
            }
        }
        self.flash_mode = FlashMode::Off;
    }

    /// Start frame delivery. Requires an attached camera.
    pub fn start_preview(&mut self) -> Result<(), CaptureError> {
        if self.video.is_none() {
            return Err(CaptureError::ConfigurationFailed("no video input attached".into()));
        }
        if !self.running {
            self.hardware.start_running()?;
            self.running = true;
        }
        Ok(())
    }

    pub fn start_recording(&mut self, file: &Path, completion: CompletionHandle) -> Result<(), CaptureError> {
        if self.recording {
            return Err(CaptureError::InvalidState("recording"));
        }
        if !self.running {
            return Err(CaptureError::ConfigurationFailed("preview is not running".into()));
        }
        self.hardware.start_recording(file, completion)?;
        self.recording = true;
        Ok(())
    }

    /// Ask the hardware to stop. The session counts as recording until
    /// `recording_finished` is called for the completion.
    pub fn stop_recording(&mut self) -> Result<(), CaptureError> {
        if !self.recording {
            return Ok(());
        }
        self.hardware.stop_recording()
    }

    pub fn recording_finished(&mut self) {
        self.recording = false;
    }

    fn slot_mut(&mut self, media: MediaKind) -> &mut Option<DeviceInput> {
        match media {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.recording {
            if let Err(e) = self.hardware.stop_recording() {
                log::warn!("failed to stop recording on release: {}", e);
            }
            self.recording = false;
        }
        if self.running {
            self.hardware.stop_running();
            self.running = false;
        }
        log::info!("capture hardware released");
    }
}

enum Change {
    Attached(DeviceInput),
    Detached(DeviceInput),
}

/// An open configuration block on a `CaptureSession`.
///
/// Changes are journaled; `commit` applies them, and dropping without a
/// successful commit undoes them so the session is never left half-configured.
///
/// A failed `attach` puts back the input it displaced. If that is not
/// possible the transaction is poisoned and `commit` rolls back instead.
pub struct ConfigurationTransaction<'a> {
    session: &'a mut CaptureSession,
    journal: Vec<Change>,
    poisoned: Option<CaptureError>,
    open: bool,
}

impl ConfigurationTransaction<'_> {
    /// Attach `input`, replacing whatever input of the same media kind is attached.
    ///
    /// On failure the replaced input, if any, is attached again.
    pub fn attach(&mut self, input: DeviceInput) -> Result<(), CaptureError> {
        let media = input.media();
        let displaced = self.detach(media);

        if let Err(e) = self.add(&input) {
            if let Some(previous) = displaced {
                self.reinstate(previous);
            }
            return Err(e);
        }

        *self.session.slot_mut(media) = Some(input.clone());
        self.journal.push(Change::Attached(input));
        Ok(())
    }

    fn add(&mut self, input: &DeviceInput) -> Result<(), CaptureError> {
        if !self.session.hardware.can_add_input(input) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "session rejected input {}",
                input.device.id
            )));
        }
        self.session
            .hardware
            .add_input(input)
            .map_err(into_configuration_failure)
    }

    /// Undo the `detach` that `attach` made for `previous`.
    fn reinstate(&mut self, previous: DeviceInput) {
        self.journal.pop();
        match self.session.hardware.add_input(&previous) {
            Ok(()) => {
                let media = previous.media();
                *self.session.slot_mut(media) = Some(previous);
            }
            Err(e) => {
                log::error!("could not reattach {}: {}", previous.device.id, e);
                self.journal.push(Change::Detached(previous));
                self.poisoned = Some(into_configuration_failure(e));
            }
        }
    }

    /// Remove the input of `media` kind, if any.
    pub fn detach(&mut self, media: MediaKind) -> Option<DeviceInput> {
        let input = self.session.slot_mut(media).take()?;
        self.session.hardware.remove_input(&input);
        self.journal.push(Change::Detached(input.clone()));
        Some(input)
    }

    /// Apply the changes. On failure the session is rolled back to its prior
    /// configuration and the error is returned.
    pub fn commit(mut self) -> Result<(), CaptureError> {
        self.open = false;
        if let Some(e) = self.poisoned.take() {
            log::warn!("configuration poisoned, rolling back: {}", e);
            if let Err(restore) = self.restore() {
                log::error!("rollback commit failed: {}", restore);
            }
            return Err(e);
        }
        match self.session.hardware.commit_configuration() {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("configuration commit failed, rolling back: {}", e);
                self.session.hardware.begin_configuration();
                if let Err(restore) = self.restore() {
                    log::error!("rollback commit failed: {}", restore);
                }
                Err(into_configuration_failure(e))
            }
        }
    }

    fn restore(&mut self) -> Result<(), CaptureError> {
        for change in self.journal.drain(..).rev() {
            match change {
                Change::Attached(input) => {
                    self.session.hardware.remove_input(&input);
                    *self.session.slot_mut(input.media()) = None;
                }
                Change::Detached(input) => match self.session.hardware.add_input(&input) {
                    Ok(()) => {
                        let media = input.media();
                        *self.session.slot_mut(media) = Some(input);
                    }
                    Err(e) => log::error!("could not restore input {}: {}", input.device.id, e),
                },
            }
        }
        self.session.hardware.commit_configuration()
    }
}

impl Drop for ConfigurationTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.restore() {
                log::error!("rollback commit failed: {}", e);
            }
        }
    }
}

fn into_configuration_failure(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::ConfigurationFailed(_) => error,
        other => CaptureError::ConfigurationFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRig;
    use std::sync::Arc;

    fn open(rig: &Arc<FakeRig>) -> CaptureSession {
        CaptureSession::open(rig.as_ref(), QualityPreset::High).unwrap()
    }

    fn configured(rig: &Arc<FakeRig>) -> CaptureSession {
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = open(rig);
        let mut tx = session.begin_configuration().unwrap();
        tx.attach(negotiator.video_input(DevicePosition::Back, QualityPreset::High).unwrap())
            .unwrap();
        tx.attach(negotiator.audio_input(QualityPreset::High).unwrap()).unwrap();
        tx.commit().unwrap();
        session
    }

    #[test]
    fn open_holds_hardware_until_dropped() {
        let rig = FakeRig::phone();
        let session = open(&rig);
        assert!(rig.is_leased());
        assert_eq!(
            CaptureSession::open(rig.as_ref(), QualityPreset::High).err(),
            Some(CaptureError::DeviceBusy)
        );
        drop(session);
        assert!(!rig.is_leased());
    }

    #[test]
    fn commit_applies_inputs() {
        let rig = FakeRig::phone();
        let session = configured(&rig);

        assert_eq!(session.position(), Some(DevicePosition::Back));
        assert!(session.audio_input().is_some());
        assert_eq!(rig.attached(), vec!["back-wide".to_string(), "mic".to_string()]);
    }

    #[test]
    fn rejected_input_rolls_back_whole_transaction() {
        let rig = FakeRig::phone();
        rig.reject_input("mic");
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = open(&rig);

        {
            let mut tx = session.begin_configuration().unwrap();
            tx.attach(negotiator.video_input(DevicePosition::Back, QualityPreset::High).unwrap())
                .unwrap();
            let err = tx.attach(negotiator.audio_input(QualityPreset::High).unwrap()).unwrap_err();
            assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        }

        assert!(!session.has_video_input());
        assert!(rig.attached().is_empty());
    }

    #[test]
    fn failed_commit_restores_previous_configuration() {
        let rig = FakeRig::phone();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        rig.fail_next_commit();
        let err = session.flip(DevicePosition::Front, &negotiator).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        assert_eq!(session.position(), Some(DevicePosition::Back));
        assert_eq!(rig.attached(), vec!["back-wide".to_string(), "mic".to_string()]);
    }

    #[test]
    fn flip_swaps_camera_and_keeps_microphone() {
        let rig = FakeRig::phone();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        session.flip(DevicePosition::Front, &negotiator).unwrap();
        assert_eq!(session.position(), Some(DevicePosition::Front));
        assert_eq!(session.audio_input().map(|a| a.device.id.as_str()), Some("mic"));
        assert_eq!(rig.attached(), vec!["front-wide".to_string(), "mic".to_string()]);
    }

    #[test]
    fn flip_to_missing_position_keeps_previous_inputs() {
        let rig = FakeRig::back_only();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        assert_eq!(
            session.flip(DevicePosition::Front, &negotiator),
            Err(CaptureError::DeviceUnavailable(DevicePosition::Front))
        );
        assert_eq!(session.position(), Some(DevicePosition::Back));
        assert!(session.audio_input().is_some());
        assert_eq!(rig.attached(), vec!["back-wide".to_string(), "mic".to_string()]);
    }

    #[test]
    fn no_reconfiguration_while_recording() {
        let rig = FakeRig::phone();
        let mut session = configured(&rig);
        session.start_preview().unwrap();
        let handle = rig.arm_completion();
        let file = std::env::temp_dir().join(format!("capture_session_{}.mov", uuid::Uuid::new_v4()));
        session.start_recording(&file, handle).unwrap();

        assert!(matches!(
            session.begin_configuration(),
            Err(CaptureError::ConfigurationFailed(_))
        ));

        session.recording_finished();
        assert!(session.begin_configuration().is_ok());
        std::fs::remove_file(&file).ok();
    }

    #[test]
    fn recording_requires_running_preview() {
        let rig = FakeRig::phone();
        let mut session = configured(&rig);
        let file = std::env::temp_dir().join("capture_session_not_running.mov");
        let err = session.start_recording(&file, rig.arm_completion()).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }

    #[test]
    fn flash_only_on_back_camera_with_flash() {
        let rig = FakeRig::phone();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        assert_eq!(session.set_flash_mode(FlashMode::On).unwrap(), FlashMode::On);
        assert_eq!(rig.flash_changes(), 1);
        assert_eq!(rig.torch(), FlashMode::On);

        session.flip(DevicePosition::Front, &negotiator).unwrap();
        assert_eq!(session.flash_mode(), FlashMode::Off);
        // The back camera's torch was switched off on the way out.
        assert_eq!(rig.torch(), FlashMode::Off);
        assert_eq!(rig.flash_changes(), 2);

        assert_eq!(session.set_flash_mode(FlashMode::On).unwrap(), FlashMode::Off);
        assert_eq!(rig.flash_changes(), 2);
    }

    #[test]
    fn failed_flip_leaves_flash_off() {
        let rig = FakeRig::back_only();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);
        session.set_flash_mode(FlashMode::On).unwrap();

        assert!(session.flip(DevicePosition::Front, &negotiator).is_err());
        assert_eq!(session.flash_mode(), FlashMode::Off);
        assert_eq!(rig.torch(), FlashMode::Off);
    }

    #[test]
    fn rejected_replacement_keeps_current_input() {
        let rig = FakeRig::phone();
        rig.reject_input("front-wide");
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        let mut tx = session.begin_configuration().unwrap();
        let front = negotiator.video_input(DevicePosition::Front, QualityPreset::High).unwrap();
        assert!(matches!(tx.attach(front), Err(CaptureError::ConfigurationFailed(_))));
        tx.commit().unwrap();

        assert!(session.has_video_input());
        assert_eq!(session.position(), Some(DevicePosition::Back));
        assert!(rig.attached().contains(&"back-wide".to_string()));
        session.start_preview().unwrap();
    }

    #[test]
    fn unrecoverable_attach_failure_poisons_commit() {
        let rig = FakeRig::phone();
        rig.reject_input("front-wide");
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        let mut tx = session.begin_configuration().unwrap();
        let front = negotiator.video_input(DevicePosition::Front, QualityPreset::High).unwrap();
        // Putting the back camera back fails once.
        rig.fail_next_add();
        assert!(tx.attach(front).is_err());
        assert!(matches!(tx.commit(), Err(CaptureError::ConfigurationFailed(_))));

        // The rollback reattached it.
        assert_eq!(session.position(), Some(DevicePosition::Back));
        assert!(rig.attached().contains(&"back-wide".to_string()));
    }

    #[test]
    fn stabilization_follows_the_camera() {
        let rig = FakeRig::phone();
        let negotiator = DeviceNegotiator::new(rig.clone());
        let mut session = configured(&rig);

        session.set_stabilization(StabilizationMode::Auto).unwrap();
        assert_eq!(rig.stabilization(), vec![StabilizationMode::Auto]);

        session.flip(DevicePosition::Front, &negotiator).unwrap();
        assert_eq!(session.stabilization(), StabilizationMode::Auto);
        assert_eq!(rig.stabilization(), vec![StabilizationMode::Auto, StabilizationMode::Auto]);
    }

    #[test]
    fn drop_stops_preview() {
        let rig = FakeRig::phone();
        let mut session = configured(&rig);
        session.start_preview().unwrap();
        assert!(rig.is_running());
        drop(session);
        assert!(!rig.is_running());
        assert!(!rig.is_leased());
    }
}
