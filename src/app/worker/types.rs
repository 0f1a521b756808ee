//! State shared by every worker of one download manager

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::stats::StatsCounters;
use crate::app::backoff::BackoffController;
use crate::app::cache::ContentCache;
use crate::app::client::Fetcher;
use crate::app::pacing::{SubmissionClock, WirePacer};
use crate::app::queue::WorkQueue;
use crate::constants::scheduler;

/// Per-iteration knobs for the worker loop
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Longest a worker blocks on an empty queue before re-checking liveness
    pub idle_poll: Duration,
    /// Longest a parked item sleeps before going back on the queue
    pub park_interval: Duration,
    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,
    /// Failed fetches tolerated per item, `None` for unbounded
    pub max_retries: Option<u32>,
    /// Log queueing and fetch events at info level
    pub verbose: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_poll: scheduler::IDLE_POLL,
            park_interval: scheduler::PARK_INTERVAL,
            fetch_timeout: scheduler::FETCH_TIMEOUT,
            max_retries: None,
            verbose: false,
        }
    }
}

/// Everything a worker needs, owned once per manager and shared via `Arc`
pub struct SharedState {
    pub queue: WorkQueue,
    pub cache: ContentCache,
    pub fetcher: Arc<dyn Fetcher>,
    pub clock: SubmissionClock,
    pub wire: WirePacer,
    pub backoff: BackoffController,
    pub stats: StatsCounters,
    pub settings: WorkerSettings,
    alive: watch::Sender<bool>,
}

impl SharedState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: WorkQueue,
        cache: ContentCache,
        fetcher: Arc<dyn Fetcher>,
        clock: SubmissionClock,
        wire: WirePacer,
        backoff: BackoffController,
        settings: WorkerSettings,
    ) -> Self {
        let (alive, _) = watch::channel(true);
        Self {
            queue,
            cache,
            fetcher,
            clock,
            wire,
            backoff,
            stats: StatsCounters::default(),
            settings,
            alive,
        }
    }

    /// Whether worker and monitor loops should keep going
    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    /// Flip `alive` to false; returns whether this call did the flip
    pub fn stop(&self) -> bool {
        let was_alive = self.alive.send_replace(false);
        if was_alive {
            self.queue.wake_all();
        }
        was_alive
    }

    /// Receiver that observes the liveness flag
    pub fn liveness(&self) -> watch::Receiver<bool> {
        self.alive.subscribe()
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("queue", &self.queue)
            .field("cache", &self.cache)
            .field("backoff", &self.backoff)
            .field("settings", &self.settings)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// Resolves once `alive` has been flipped to false
pub async fn stopped(mut liveness: watch::Receiver<bool>) {
    // A dropped sender means the manager is gone, which also counts.
    let _ = liveness.wait_for(|alive| !*alive).await;
}
