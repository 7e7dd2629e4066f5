use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Periodic tick that drives elapsed-time updates while recording.
///
/// Owned by the controller task and dropped on every transition out of
/// `Recording`, so a tick can never fire for a finished session.
pub struct DurationTimer {
    interval: Interval,
}

impl DurationTimer {
    /// First tick fires one period from now.
    pub fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
