//! Recorder thread for the virtual rig.
//!
//! Writes synthetic frames to the container file on a dedicated thread and
//! reports how the recording ended through the `CompletionHandle`, from that
//! thread, the way real capture hardware calls back on its own queue.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use capture_core::models::error::CaptureError;
use capture_core::models::recording_result::RecordingCompletion;
use capture_core::session::output_sink::CompletionHandle;

use crate::rig::RigState;

const FRAME_BYTES: usize = 4096;

/// One running recording.
pub struct FrameRecorder {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameRecorder {
    /// Create `file` and start writing frames to it.
    ///
    /// The file is created before this returns, so a failure to create it is
    /// reported synchronously rather than through the completion.
    pub fn start(
        file: &Path,
        frame_interval: Duration,
        completion: CompletionHandle,
        rig: Arc<RigState>,
    ) -> Result<Self, CaptureError> {
        let output = File::create(file).map_err(|e| CaptureError::RecordingFailed {
            reason: format!("cannot create {}: {}", file.display(), e),
            partial_file: None,
        })?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let path = file.to_path_buf();
        let handle = thread::Builder::new()
            .name("virtual-recorder".into())
            .spawn(move || {
                let outcome = record_loop(&flag, BufWriter::new(output), &path, frame_interval, &rig);
                flag.store(false, Ordering::SeqCst);
                rig.report(completion, outcome);
            })
            .map_err(|e| CaptureError::RecordingFailed {
                reason: format!("failed to spawn recorder thread: {}", e),
                partial_file: Some(file.to_path_buf()),
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the thread to finish. Returns at once; the thread closes the file
    /// and resolves the completion on its own.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for FrameRecorder {
    fn drop(&mut self) {
        self.request_stop();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let join = move || {
            if handle.join().is_err() {
                log::error!("virtual recorder thread panicked");
            }
        };
        // Never join on an async worker.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(join);
            }
            Err(_) => join(),
        }
    }
}

fn record_loop(
    running: &AtomicBool,
    mut output: BufWriter<File>,
    path: &Path,
    frame_interval: Duration,
    rig: &RigState,
) -> RecordingCompletion {
    let frame = [0x5au8; FRAME_BYTES];
    let mut frames: u64 = 0;

    while running.load(Ordering::SeqCst) {
        if rig.write_should_fail(frames) {
            return failed(output, path, "simulated write error");
        }
        if let Err(e) = output.write_all(&frame) {
            return failed(output, path, &e.to_string());
        }
        frames += 1;
        rig.frame_written();
        thread::sleep(frame_interval);
    }

    match output.into_inner().map(|file| file.sync_all()) {
        Ok(Ok(())) => RecordingCompletion::Finished {
            file: path.to_path_buf(),
        },
        Ok(Err(e)) => partial(path, &e.to_string()),
        Err(e) => partial(path, &e.to_string()),
    }
}

fn failed(output: BufWriter<File>, path: &Path, reason: &str) -> RecordingCompletion {
    // Keep what already reached the buffer; the partial file is the caller's to salvage.
    match output.into_inner() {
        Ok(file) => {
            if let Err(e) = file.sync_all() {
                log::warn!("could not sync partial file {}: {}", path.display(), e);
            }
        }
        Err(e) => log::warn!("could not flush partial file {}: {}", path.display(), e.error()),
    }
    partial(path, reason)
}

fn partial(path: &Path, reason: &str) -> RecordingCompletion {
    log::warn!("virtual recording {} failed: {}", path.display(), reason);
    RecordingCompletion::Failed {
        reason: reason.to_string(),
        partial_file: existing(path),
    }
}

fn existing(path: &Path) -> Option<PathBuf> {
    path.exists().then(|| path.to_path_buf())
}
