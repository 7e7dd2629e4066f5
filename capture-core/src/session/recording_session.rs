use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// Bookkeeping for one start-to-finalize recording.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    id: Uuid,
    file_path: PathBuf,
    started_at: Instant,
    max_duration: Duration,
    elapsed: Duration,
}

impl RecordingSession {
    pub fn new(id: Uuid, file_path: PathBuf, started_at: Instant, max_duration: Duration) -> Self {
        Self {
            id,
            file_path,
            started_at,
            max_duration,
            elapsed: Duration::ZERO,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Recompute the elapsed time from the start instant. Never decreases.
    pub fn advance(&mut self, now: Instant) -> Duration {
        let measured = now.saturating_duration_since(self.started_at);
        self.elapsed = self.elapsed.max(measured);
        self.elapsed
    }

    pub fn limit_reached(&self) -> bool {
        self.elapsed >= self.max_duration
    }
}
