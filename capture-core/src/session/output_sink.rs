use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingCompletion;

/// Hardware-side half of a recording completion.
///
/// Cloneable and `Send`; the first `resolve` wins and later calls are ignored,
/// whichever thread they come from.
#[derive(Clone)]
pub struct CompletionHandle {
    session_id: Uuid,
    slot: Arc<Mutex<Option<oneshot::Sender<RecordingCompletion>>>>,
}

impl CompletionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Report how the recording ended. Returns `false` if it was already resolved.
    pub fn resolve(&self, completion: RecordingCompletion) -> bool {
        let Some(sender) = self.slot.lock().take() else {
            log::debug!("completion for {} already resolved", self.session_id);
            return false;
        };
        // The receiver may be gone if the controller shut down; nothing to report to.
        let _ = sender.send(completion);
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.lock().is_none()
    }
}

struct Outstanding {
    session_id: Uuid,
    file_path: PathBuf,
    handle: CompletionHandle,
    receiver: oneshot::Receiver<RecordingCompletion>,
}

/// Bridges the hardware's out-of-band "recording finished" notification into
/// the controller.
///
/// At most one completion is outstanding at a time. The controller awaits
/// `completion()` on its own task, so the hardware's result is only acted on
/// from the controller's context.
#[derive(Default)]
pub struct OutputSink {
    outstanding: Option<Outstanding>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare a completion for a new recording session and return the handle
    /// the hardware resolves.
    pub fn arm(&mut self, session_id: Uuid, file_path: &Path) -> Result<CompletionHandle, CaptureError> {
        if let Some(current) = &self.outstanding {
            return Err(CaptureError::ConfigurationFailed(format!(
                "completion for session {} still outstanding",
                current.session_id
            )));
        }

        let (sender, receiver) = oneshot::channel();
        let handle = CompletionHandle {
            session_id,
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        self.outstanding = Some(Outstanding {
            session_id,
            file_path: file_path.to_path_buf(),
            handle: handle.clone(),
            receiver,
        });
        Ok(handle)
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Wait for the outstanding completion. Pending forever when nothing is
    /// outstanding, which makes it usable as a `select!` branch.
    ///
    /// Cancel safe: dropping the future before it resolves keeps the
    /// completion outstanding.
    pub async fn completion(&mut self) -> (Uuid, RecordingCompletion) {
        let Some(outstanding) = self.outstanding.as_mut() else {
            return std::future::pending().await;
        };

        let completion = match (&mut outstanding.receiver).await {
            Ok(completion) => completion,
            Err(_) => RecordingCompletion::Failed {
                reason: "capture output closed without reporting completion".into(),
                partial_file: existing(&outstanding.file_path),
            },
        };
        let session_id = outstanding.session_id;
        self.outstanding = None;
        (session_id, completion)
    }

    /// Resolve the outstanding completion as cancelled so no waiter is left
    /// suspended. A hardware report arriving afterwards is ignored.
    pub fn cancel(&mut self) -> Option<Uuid> {
        let outstanding = self.outstanding.take()?;
        outstanding.handle.resolve(RecordingCompletion::Cancelled);
        Some(outstanding.session_id)
    }
}

fn existing(path: &Path) -> Option<PathBuf> {
    path.exists().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn path() -> PathBuf {
        std::env::temp_dir().join("capture_sink_test.mov")
    }

    #[tokio::test]
    async fn resolves_from_foreign_thread() {
        let mut sink = OutputSink::new();
        let id = Uuid::new_v4();
        let handle = sink.arm(id, &path()).unwrap();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            handle.resolve(RecordingCompletion::Finished { file: path() })
        });

        let (session_id, completion) = sink.completion().await;
        assert_eq!(session_id, id);
        assert_eq!(completion, RecordingCompletion::Finished { file: path() });
        assert!(worker.join().unwrap());
        assert!(!sink.is_outstanding());
    }

    #[test]
    fn only_one_outstanding_completion() {
        let mut sink = OutputSink::new();
        sink.arm(Uuid::new_v4(), &path()).unwrap();
        assert!(matches!(
            sink.arm(Uuid::new_v4(), &path()),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn first_resolution_wins() {
        let mut sink = OutputSink::new();
        let handle = sink.arm(Uuid::new_v4(), &path()).unwrap();
        let other = handle.clone();

        assert!(handle.resolve(RecordingCompletion::Finished { file: path() }));
        assert!(!other.resolve(RecordingCompletion::Failed {
            reason: "late".into(),
            partial_file: None,
        }));
        assert!(other.is_resolved());
    }

    #[tokio::test]
    async fn cancel_wins_over_late_hardware_report() {
        let mut sink = OutputSink::new();
        let id = Uuid::new_v4();
        let handle = sink.arm(id, &path()).unwrap();

        assert_eq!(sink.cancel(), Some(id));
        assert!(!handle.resolve(RecordingCompletion::Finished { file: path() }));
        assert!(!sink.is_outstanding());
        assert_eq!(sink.cancel(), None);
    }

    #[tokio::test]
    async fn idle_sink_never_resolves() {
        let mut sink = OutputSink::new();
        let waited = tokio::time::timeout(Duration::from_millis(10), sink.completion()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn rearm_after_completion() {
        let mut sink = OutputSink::new();
        let handle = sink.arm(Uuid::new_v4(), &path()).unwrap();
        handle.resolve(RecordingCompletion::Finished { file: path() });
        sink.completion().await;

        assert!(sink.arm(Uuid::new_v4(), &path()).is_ok());
    }
}
