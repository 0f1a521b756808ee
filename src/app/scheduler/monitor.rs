//! Remaining/ETA line shown while downloads are running

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::worker::types::{stopped, SharedState};

/// Periodically redraws `Remaining: N items. ETA: ...` until the manager stops
pub struct ProgressMonitor {
    shared: Arc<SharedState>,
    throttle: Duration,
    update_interval: Duration,
}

impl ProgressMonitor {
    pub fn new(shared: Arc<SharedState>, throttle: Duration, update_interval: Duration) -> Self {
        Self {
            shared,
            throttle,
            update_interval,
        }
    }

    /// Spawn the monitor task
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );

            let mut ticker = tokio::time::interval(self.update_interval);
            let stop = stopped(self.shared.liveness());
            tokio::pin!(stop);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let remaining = self.shared.queue.outstanding();
                        bar.set_message(progress_message(remaining, self.throttle, Local::now()));
                        bar.tick();
                    }
                    _ = &mut stop => break,
                }
            }

            bar.finish_and_clear();
            debug!("Progress monitor stopped");
        })
    }
}

/// Estimated time left for `remaining` items at one fetch per `throttle`
pub fn estimate_remaining(remaining: usize, throttle: Duration) -> Duration {
    throttle.saturating_mul(u32::try_from(remaining).unwrap_or(u32::MAX))
}

/// Render the monitor line for the given moment
pub fn progress_message(remaining: usize, throttle: Duration, now: DateTime<Local>) -> String {
    let left = estimate_remaining(remaining, throttle);
    let eta = chrono::Duration::from_std(left)
        .ok()
        .and_then(|left| now.checked_add_signed(left))
        .unwrap_or(now);

    format!(
        "Remaining: {} items. ETA: {} ( {} minutes )",
        remaining,
        eta.format("%a, %H:%M:%S"),
        left.as_secs() / 60
    )
}
