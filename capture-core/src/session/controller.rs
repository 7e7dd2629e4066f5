use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::config::{CaptureConfiguration, SessionConfig};
use crate::models::device_models::{DevicePosition, FlashMode};
use crate::models::error::CaptureError;
use crate::models::permission::PermissionResource;
use crate::models::recording_result::{RecordedMedia, RecordingCompletion, RecordingMetadata, RecordingResult};
use crate::models::state::ControllerState;
use crate::permissions::gate::PermissionGate;
use crate::session::capture_session::CaptureSession;
use crate::session::negotiator::DeviceNegotiator;
use crate::session::output_sink::OutputSink;
use crate::session::recording_session::RecordingSession;
use crate::session::timer::DurationTimer;
use crate::storage::checksum::sha256_file;
use crate::storage::output_path::recording_path;
use crate::traits::capture_hardware::CaptureHardware;
use crate::traits::controller_delegate::ControllerDelegate;

const MAILBOX_CAPACITY: usize = 32;

/// Observable controller state, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    /// Elapsed time of the active recording; zero when none is active.
    pub elapsed: Duration,
    pub last_error: Option<CaptureError>,
    pub position: DevicePosition,
    pub flash_mode: FlashMode,
    /// Whether the duration timer is alive.
    pub timer_active: bool,
    /// Whether this controller holds the capture hardware.
    pub hardware_held: bool,
    pub recording_id: Option<Uuid>,
    pub last_recording: Option<RecordingResult>,
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Uuid),
    /// A recording was already active; nothing changed.
    AlreadyRecording,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Setup(Reply<Result<(), CaptureError>>),
    Start(Reply<Result<StartOutcome, CaptureError>>),
    Stop(Reply<Option<RecordingResult>>),
    Flip(Reply<Result<DevicePosition, CaptureError>>),
    ToggleFlash(Reply<Result<FlashMode, CaptureError>>),
    Teardown(Reply<()>),
}

enum Event {
    Command(Command),
    MailboxClosed,
    SetupFinished(Result<CaptureSession, CaptureError>),
    Tick(Instant),
    Completion(Uuid, RecordingCompletion),
}

/// Cloneable front end to a running `RecordingController`.
///
/// Every call is a message to the controller task, so calls from any number
/// of clones are serialized. When the last handle is dropped the controller
/// tears down and exits.
#[derive(Clone)]
pub struct ControllerHandle {
    mailbox: mpsc::Sender<Command>,
    snapshot: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    /// Acquire permissions and hardware and start the preview.
    ///
    /// No-op once the preview is up. Concurrent calls join the attempt in
    /// progress.
    pub async fn setup(&self) -> Result<(), CaptureError> {
        self.call(Command::Setup).await?
    }

    pub async fn start(&self) -> Result<StartOutcome, CaptureError> {
        self.call(Command::Start).await?
    }

    /// Stop the active recording and wait for it to be finalized.
    ///
    /// Returns `None` when there was nothing to stop, including when another
    /// stop (explicit or automatic) is already finalizing.
    pub async fn stop(&self) -> Result<Option<RecordingResult>, CaptureError> {
        self.call(Command::Stop).await
    }

    /// Switch between the front and back camera. Returns the new position.
    pub async fn flip(&self) -> Result<DevicePosition, CaptureError> {
        self.call(Command::Flip).await?
    }

    /// Toggle the flash. Returns the mode in effect afterwards.
    pub async fn toggle_flash(&self) -> Result<FlashMode, CaptureError> {
        self.call(Command::ToggleFlash).await?
    }

    /// Release everything and return to idle. Always succeeds.
    pub async fn teardown(&self) {
        if self.call(Command::Teardown).await.is_err() {
            log::debug!("teardown on a closed controller");
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> ControllerState {
        self.snapshot.borrow().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ControllerSnapshot) -> bool,
    ) -> Result<ControllerSnapshot, CaptureError> {
        let mut receiver = self.snapshot.clone();
        let snapshot = receiver
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| CaptureError::ControllerClosed)?
            .clone();
        Ok(snapshot)
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, CaptureError> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(command(reply))
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        response.await.map_err(|_| CaptureError::ControllerClosed)
    }
}

/// The recording state machine.
///
/// Runs as a single task that owns the capture session, the output sink and
/// the duration timer. Commands, setup results, timer ticks and hardware
/// completions are all handled one at a time on that task.
pub struct RecordingController {
    hardware: Arc<dyn CaptureHardware>,
    negotiator: DeviceNegotiator,
    gate: Arc<PermissionGate>,
    config: CaptureConfiguration,
    delegate: Option<Arc<dyn ControllerDelegate>>,

    state: ControllerState,
    session: Option<CaptureSession>,
    setup_task: Option<JoinHandle<Result<CaptureSession, CaptureError>>>,
    setup_waiters: Vec<Reply<Result<(), CaptureError>>>,
    recording: Option<RecordingSession>,
    timer: Option<DurationTimer>,
    sink: OutputSink,
    stop_waiters: Vec<Reply<Option<RecordingResult>>>,
    last_error: Option<CaptureError>,
    last_recording: Option<RecordingResult>,
    snapshot: watch::Sender<ControllerSnapshot>,
}

impl RecordingController {
    pub fn new(
        hardware: Arc<dyn CaptureHardware>,
        gate: Arc<PermissionGate>,
        config: CaptureConfiguration,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let initial = ControllerSnapshot {
            state: ControllerState::Idle,
            elapsed: Duration::ZERO,
            last_error: None,
            position: config.session.position,
            flash_mode: config.session.flash_mode,
            timer_active: false,
            hardware_held: false,
            recording_id: None,
            last_recording: None,
        };
        let (snapshot, _) = watch::channel(initial);

        Ok(Self {
            negotiator: DeviceNegotiator::new(Arc::clone(&hardware)),
            hardware,
            gate,
            config,
            delegate: None,
            state: ControllerState::Idle,
            session: None,
            setup_task: None,
            setup_waiters: Vec::new(),
            recording: None,
            timer: None,
            sink: OutputSink::new(),
            stop_waiters: Vec::new(),
            last_error: None,
            last_recording: None,
            snapshot,
        })
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn ControllerDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Start the controller task. Must be called within a tokio runtime.
    pub fn spawn(self) -> ControllerHandle {
        let (mailbox, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let handle = ControllerHandle {
            mailbox,
            snapshot: self.snapshot.subscribe(),
        };
        tokio::spawn(self.run(inbox));
        handle
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        loop {
            let event = tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::MailboxClosed,
                },
                outcome = setup_outcome(&mut self.setup_task) => Event::SetupFinished(outcome),
                (session_id, completion) = self.sink.completion() => Event::Completion(session_id, completion),
                now = next_tick(&mut self.timer) => Event::Tick(now),
            };

            match event {
                Event::Command(command) => self.handle(command).await,
                Event::MailboxClosed => {
                    self.teardown().await;
                    break;
                }
                Event::SetupFinished(outcome) => self.finish_setup(outcome),
                Event::Tick(now) => self.on_tick(now).await,
                Event::Completion(session_id, completion) => self.finalize(session_id, completion).await,
            }
        }
        log::debug!("recording controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Setup(reply) => self.setup(reply),
            Command::Start(reply) => {
                let _ = reply.send(self.start());
            }
            Command::Stop(reply) => {
                if self.state.is_recording() {
                    self.begin_stop(Some(reply)).await;
                } else {
                    let _ = reply.send(None);
                }
            }
            Command::Flip(reply) => {
                let _ = reply.send(self.flip());
            }
            Command::ToggleFlash(reply) => {
                let _ = reply.send(self.toggle_flash());
            }
            Command::Teardown(reply) => {
                self.teardown().await;
                let _ = reply.send(());
            }
        }
    }

    fn setup(&mut self, reply: Reply<Result<(), CaptureError>>) {
        match self.state {
            ControllerState::Configuring => {
                self.setup_waiters.push(reply);
                return;
            }
            ControllerState::PreviewReady | ControllerState::Recording | ControllerState::Finalizing => {
                let _ = reply.send(Ok(()));
                return;
            }
            ControllerState::Idle if self.session.is_some() => {
                // Hardware kept from the previous recording; the preview is still running.
                self.transition(ControllerState::PreviewReady);
                let _ = reply.send(Ok(()));
                return;
            }
            ControllerState::Idle | ControllerState::Failed(_) => {}
        }

        if self.session.take().is_some() {
            log::debug!("dropping session left over from a failed attempt");
        }
        self.setup_waiters.push(reply);
        self.setup_task = Some(tokio::spawn(configure(
            Arc::clone(&self.gate),
            self.negotiator.clone(),
            Arc::clone(&self.hardware),
            self.config.session,
        )));
        self.transition(ControllerState::Configuring);
    }

    fn finish_setup(&mut self, outcome: Result<CaptureSession, CaptureError>) {
        let result = match outcome {
            Ok(mut session) => {
                if let Err(e) = session.set_flash_mode(self.config.session.flash_mode) {
                    log::warn!("could not apply flash mode: {}", e);
                }
                log::info!(
                    "preview ready on {} camera",
                    session.position().unwrap_or(self.config.session.position)
                );
                self.session = Some(session);
                self.transition(ControllerState::PreviewReady);
                Ok(())
            }
            Err(e) => {
                log::error!("setup failed: {}", e);
                self.fail(e.clone());
                Err(e)
            }
        };
        for waiter in self.setup_waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    fn start(&mut self) -> Result<StartOutcome, CaptureError> {
        match self.state {
            ControllerState::PreviewReady => {}
            ControllerState::Recording => return Ok(StartOutcome::AlreadyRecording),
            ref other => return Err(CaptureError::InvalidState(other.name())),
        }
        let Some(session) = self.session.as_mut() else {
            return Err(CaptureError::InvalidState("idle"));
        };

        let session_id = Uuid::new_v4();
        let file = recording_path(&self.config.output_directory, session_id, &self.config.file_extension);
        let completion = self.sink.arm(session_id, &file)?;
        if let Err(e) = session.start_recording(&file, completion) {
            self.sink.cancel();
            log::error!("hardware refused to start recording: {}", e);
            self.record_error(e.clone());
            return Err(e);
        }

        self.recording = Some(RecordingSession::new(
            session_id,
            file,
            Instant::now(),
            self.config.max_duration(),
        ));
        self.timer = Some(DurationTimer::start(self.config.tick_interval()));
        self.transition(ControllerState::Recording);
        log::info!("recording {} started", session_id);
        Ok(StartOutcome::Started(session_id))
    }

    /// Shared by explicit stop and auto-stop.
    async fn begin_stop(&mut self, waiter: Option<Reply<Option<RecordingResult>>>) {
        if let Some(waiter) = waiter {
            self.stop_waiters.push(waiter);
        }
        if let Some(recording) = self.recording.as_mut() {
            recording.advance(Instant::now());
        }
        self.transition(ControllerState::Finalizing);

        let stopped = match self.session.as_mut() {
            Some(session) => session.stop_recording(),
            None => Err(CaptureError::InvalidState("idle")),
        };
        if let Err(e) = stopped {
            log::error!("hardware refused to stop recording: {}", e);
            let Some(session_id) = self.sink.cancel() else {
                return;
            };
            let partial_file = self
                .recording
                .as_ref()
                .map(|r| r.file_path().to_path_buf())
                .filter(|path| path.exists());
            self.finalize(
                session_id,
                RecordingCompletion::Failed {
                    reason: e.to_string(),
                    partial_file,
                },
            )
            .await;
        }
    }

    async fn on_tick(&mut self, now: Instant) {
        if !self.state.is_recording() {
            return;
        }
        let Some(recording) = self.recording.as_mut() else {
            return;
        };
        let elapsed = recording.advance(now);
        let limit_reached = recording.limit_reached();
        let max_duration = recording.max_duration();
        if let Some(delegate) = &self.delegate {
            delegate.on_elapsed_updated(elapsed);
        }
        self.publish();

        if limit_reached {
            log::info!("max duration {:?} reached, stopping", max_duration);
            self.begin_stop(None).await;
        }
    }

    async fn finalize(&mut self, session_id: Uuid, completion: RecordingCompletion) {
        let Some(mut recording) = self.recording.take() else {
            log::debug!("completion for {} with no active recording", session_id);
            return;
        };
        if recording.id() != session_id {
            log::warn!("ignoring completion for {}, active is {}", session_id, recording.id());
            self.recording = Some(recording);
            return;
        }
        if self.state.is_recording() {
            // The hardware ended the recording on its own.
            recording.advance(Instant::now());
        }
        self.timer = None;
        if let Some(session) = self.session.as_mut() {
            session.recording_finished();
        }

        let result = match completion {
            RecordingCompletion::Finished { file } => self.collect(&recording, file).await,
            RecordingCompletion::Failed { reason, partial_file } => {
                Err(CaptureError::RecordingFailed { reason, partial_file })
            }
            RecordingCompletion::Cancelled => Err(CaptureError::Cancelled),
        };

        self.last_recording = Some(result.clone());
        if let Some(delegate) = &self.delegate {
            delegate.on_recording_finished(&result);
        }
        match &result {
            Ok(media) => {
                log::info!(
                    "recording {} finished: {:.1}s at {}",
                    session_id,
                    media.duration.as_secs_f64(),
                    media.file_path.display()
                );
                self.transition(ControllerState::Idle);
            }
            Err(e) => {
                log::error!("recording {} failed: {}", session_id, e);
                self.fail(e.clone());
            }
        }
        for waiter in self.stop_waiters.drain(..) {
            let _ = waiter.send(Some(result.clone()));
        }
    }

    /// Build the success payload for a closed file.
    async fn collect(&mut self, recording: &RecordingSession, file: PathBuf) -> RecordingResult {
        let position = self.current_position();
        let preset = self.config.session.preset;
        let has_audio = self.session.as_ref().is_some_and(|s| s.audio_input().is_some());

        let target = file.clone();
        let checksum = match tokio::task::spawn_blocking(move || sha256_file(&target)).await {
            Ok(Ok(checksum)) => checksum,
            Ok(Err(e)) => {
                let partial_file = file.exists().then(|| file.clone());
                return Err(CaptureError::RecordingFailed {
                    reason: format!("recorded file unreadable: {}", e),
                    partial_file,
                });
            }
            Err(e) => {
                return Err(CaptureError::RecordingFailed {
                    reason: format!("checksum task failed: {}", e),
                    partial_file: Some(file),
                })
            }
        };

        let duration = recording.elapsed();
        let metadata = RecordingMetadata::new(
            recording.id(),
            duration,
            &file.to_string_lossy(),
            &checksum,
            position,
            preset,
            has_audio,
        );
        Ok(RecordedMedia {
            session_id: recording.id(),
            file_path: file,
            duration,
            checksum,
            metadata,
        })
    }

    fn flip(&mut self) -> Result<DevicePosition, CaptureError> {
        if !self.state.is_preview_ready() {
            return Err(CaptureError::InvalidState(self.state.name()));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(CaptureError::InvalidState("idle"));
        };

        let to = session.position().unwrap_or(self.config.session.position).opposite();
        match session.flip(to, &self.negotiator) {
            Ok(()) => {
                self.config.session.position = to;
                if let Err(e) = session.set_flash_mode(self.config.session.flash_mode) {
                    log::warn!("could not re-apply flash after flip: {}", e);
                }
                self.publish();
                Ok(to)
            }
            Err(e) => {
                log::error!("flip to {} failed: {}", to, e);
                if session.has_video_input() {
                    if let Err(flash) = session.set_flash_mode(self.config.session.flash_mode) {
                        log::warn!("could not re-apply flash after failed flip: {}", flash);
                    }
                    self.record_error(e.clone());
                } else {
                    self.fail(e.clone());
                }
                Err(e)
            }
        }
    }

    fn toggle_flash(&mut self) -> Result<FlashMode, CaptureError> {
        if self.state.is_recording() {
            return Err(CaptureError::InvalidState("recording"));
        }
        let next = self.config.session.flash_mode.toggled();
        let applied = self.session.as_mut().map(|session| session.set_flash_mode(next));

        match applied {
            None => {
                self.config.session.flash_mode = next;
                self.publish();
                Ok(next)
            }
            Some(Ok(effective)) => {
                if effective == next {
                    self.config.session.flash_mode = next;
                }
                self.publish();
                Ok(effective)
            }
            Some(Err(e)) => {
                self.record_error(e.clone());
                Err(e)
            }
        }
    }

    async fn teardown(&mut self) {
        self.timer = None;

        if let Some(task) = self.setup_task.take() {
            task.abort();
            if let Ok(Ok(session)) = task.await {
                log::debug!("discarding session from aborted setup");
                drop(session);
            }
        }
        for waiter in self.setup_waiters.drain(..) {
            let _ = waiter.send(Err(CaptureError::Cancelled));
        }

        if let Some(session_id) = self.sink.cancel() {
            log::info!("completion wait for {} cancelled", session_id);
        }
        if self.recording.take().is_some() {
            let result: RecordingResult = Err(CaptureError::Cancelled);
            if let Some(delegate) = &self.delegate {
                delegate.on_recording_finished(&result);
            }
            self.last_recording = Some(result);
        }
        for waiter in self.stop_waiters.drain(..) {
            let _ = waiter.send(Some(Err(CaptureError::Cancelled)));
        }

        // Stops any recording and the preview, then releases the hardware.
        self.session = None;
        self.transition(ControllerState::Idle);
        log::info!("controller torn down");
    }

    fn fail(&mut self, error: CaptureError) {
        self.last_error = Some(error.clone());
        if let Some(delegate) = &self.delegate {
            delegate.on_error(&error);
        }
        self.transition(ControllerState::Failed(error));
    }

    fn record_error(&mut self, error: CaptureError) {
        if let Some(delegate) = &self.delegate {
            delegate.on_error(&error);
        }
        self.last_error = Some(error);
        self.publish();
    }

    /// The only place state changes. Leaving `Recording` drops the timer
    /// before the new state is published.
    fn transition(&mut self, next: ControllerState) {
        if !next.is_recording() {
            self.timer = None;
        }
        if self.state != next {
            log::debug!("{} -> {}", self.state.name(), next.name());
        }
        self.state = next;

        let snapshot = self.current_snapshot();
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(&snapshot);
        }
        self.snapshot.send_replace(snapshot);
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.current_snapshot());
    }

    fn current_position(&self) -> DevicePosition {
        self.session
            .as_ref()
            .and_then(|s| s.position())
            .unwrap_or(self.config.session.position)
    }

    fn current_snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state.clone(),
            elapsed: self.recording.as_ref().map(|r| r.elapsed()).unwrap_or_default(),
            last_error: self.last_error.clone(),
            position: self.current_position(),
            flash_mode: self
                .session
                .as_ref()
                .map(|s| s.flash_mode())
                .unwrap_or(self.config.session.flash_mode),
            timer_active: self.timer.is_some(),
            hardware_held: self.session.is_some(),
            recording_id: self.recording.as_ref().map(|r| r.id()),
            last_recording: self.last_recording.clone(),
        }
    }
}

/// Permissions, device negotiation and the initial configuration
/// transaction. Runs off the controller task.
async fn configure(
    gate: Arc<PermissionGate>,
    negotiator: DeviceNegotiator,
    hardware: Arc<dyn CaptureHardware>,
    desired: SessionConfig,
) -> Result<CaptureSession, CaptureError> {
    gate.require(PermissionResource::Camera).await?;
    gate.require(PermissionResource::Microphone).await?;

    let video = negotiator.video_input(desired.position, desired.preset)?;
    let audio = negotiator.audio_input(desired.preset);

    let mut session = CaptureSession::open(hardware.as_ref(), desired.preset)?;
    let mut tx = session.begin_configuration()?;
    tx.attach(video)?;
    if let Some(audio) = audio {
        tx.attach(audio)?;
    }
    tx.commit()?;
    if let Err(e) = session.set_stabilization(desired.stabilization) {
        log::warn!("video stabilization unavailable: {}", e);
    }
    session.start_preview()?;
    Ok(session)
}

async fn setup_outcome(
    task: &mut Option<JoinHandle<Result<CaptureSession, CaptureError>>>,
) -> Result<CaptureSession, CaptureError> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = match handle.await {
        Ok(result) => result,
        Err(e) => Err(CaptureError::ConfigurationFailed(format!("setup task failed: {}", e))),
    };
    *task = None;
    outcome
}

async fn next_tick(timer: &mut Option<DurationTimer>) -> Instant {
    match timer {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}
