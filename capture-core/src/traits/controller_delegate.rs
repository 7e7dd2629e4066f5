use std::time::Duration;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::session::controller::ControllerSnapshot;

/// Event delegate for recording controller notifications.
///
/// All methods are called from the controller task. Implementations should
/// marshal to the UI thread if needed and must not block.
pub trait ControllerDelegate: Send + Sync {
    /// Called after every state transition with the published snapshot.
    fn on_state_changed(&self, snapshot: &ControllerSnapshot);

    /// Called on each duration timer tick while recording.
    fn on_elapsed_updated(&self, elapsed: Duration);

    /// Called when an operation or the hardware reports an error.
    fn on_error(&self, error: &CaptureError);

    /// Called when a recording session ends, successfully or not.
    fn on_recording_finished(&self, result: &RecordingResult);
}
