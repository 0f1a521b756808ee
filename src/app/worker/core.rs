//! Core download worker implementation
//!
//! Each worker repeatedly claims an item from the shared queue and walks it
//! through cache lookup, the backoff gate, pacing, the fetch, the cache write
//! and finally the user callback. Workers never wait on a specific URL: an
//! item that cannot run yet is parked and put back for any worker to pick up.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::stats::Event;
use super::types::{stopped, SharedState};
use crate::app::client::{FetchResponse, ResponseMeta};
use crate::app::queue::DownloadItem;
use crate::errors::{CallbackError, TransportError, TransportResult};

/// Individual download worker
#[derive(Debug)]
pub struct DownloadWorker {
    /// Unique worker identifier
    id: u32,
    /// State shared with the rest of the pool
    shared: Arc<SharedState>,
    /// Liveness flag receiver
    liveness: watch::Receiver<bool>,
}

impl DownloadWorker {
    /// Create a new download worker
    pub fn new(id: u32, shared: Arc<SharedState>) -> Self {
        let liveness = shared.liveness();
        Self {
            id,
            shared,
            liveness,
        }
    }

    /// Start the worker loop; returns once the manager stops
    pub async fn run(self) {
        debug!("Worker {} starting", self.id);

        while self.shared.is_alive() {
            let idle_poll = self.shared.settings.idle_poll;
            if let Some(item) = self.shared.queue.pop_timeout(idle_poll).await {
                self.process(item).await;
            }
        }

        debug!("Worker {} shutting down", self.id);
    }

    /// Walk one claimed item to completion, park or requeue
    async fn process(&self, item: DownloadItem) {
        // 1. Cache lookup, bypassing pacing and backoff
        match self.shared.cache.read(&item.target).await {
            Ok(Some(body)) => {
                debug!("Worker {} serving {} from cache", self.id, item.url);
                self.shared.stats.record(Event::CacheHit);
                self.deliver(&item, None, body).await;
                self.shared.queue.complete();
                return;
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Worker {} could not read cache entry for {}, fetching instead: {}",
                self.id, item.url, e
            ),
        }

        // 2. Backoff gate
        if let Some(remaining) = self.shared.backoff.remaining() {
            self.park(item, remaining).await;
            return;
        }

        // 3. Submission-time eligibility
        if !self.sleep_until_or_stopped(item.eligible_at).await {
            debug!("Worker {} stopping, returning {} to queue", self.id, item.url);
            self.shared.queue.requeue(item);
            return;
        }

        // 4. Execution-time wire slot
        let acquired = tokio::select! {
            _ = self.shared.wire.acquire() => true,
            _ = stopped(self.liveness.clone()) => false,
        };
        if !acquired {
            self.shared.queue.requeue(item);
            return;
        }

        // A trip may have happened while this worker was pacing.
        if let Some(remaining) = self.shared.backoff.remaining() {
            self.park(item, remaining).await;
            return;
        }

        // 5. Fetch
        match self.fetch(&item).await {
            Ok(FetchResponse { meta, body }) => {
                self.shared.stats.record(Event::Fetched);
                if let Err(e) = self.shared.cache.write(&item.target, &body).await {
                    warn!("Failed to cache response for {}: {}", item.url, e);
                }
                self.deliver(&item, Some(meta), body).await;
                self.shared.queue.complete();
            }
            Err(e) => self.handle_transport_error(item, e),
        }
    }

    /// Run the fetch capability under the configured timeout
    async fn fetch(&self, item: &DownloadItem) -> TransportResult<FetchResponse> {
        let session = self.shared.backoff.current_session();
        if self.shared.settings.verbose {
            info!("Downloading: {}", item.url);
        } else {
            debug!(
                "Worker {} fetching {} (session {})",
                self.id,
                item.url,
                session.generation()
            );
        }

        let timeout = self.shared.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.shared.fetcher.fetch(&item.url, &session)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout { after: timeout }),
        }
    }

    /// Trip backoff and put the item back, or abandon it past the ceiling
    fn handle_transport_error(&self, item: DownloadItem, error: TransportError) {
        self.shared.stats.record(Event::TransportError);
        warn!(
            "Worker {} fetch of {} failed (attempt {}): {}",
            self.id,
            item.url,
            item.attempt + 1,
            error
        );

        self.shared.backoff.trip();

        if let Some(max_retries) = self.shared.settings.max_retries {
            if item.attempt >= max_retries {
                error!(
                    "Abandoning {} after {} failed attempts: {}",
                    item.url,
                    item.attempt + 1,
                    error
                );
                self.shared.stats.record(Event::Abandoned);
                self.shared.queue.complete();
                return;
            }
        }

        let retry = item.retry(self.shared.clock.assign());
        self.shared.stats.record(Event::Requeued);
        self.shared.queue.requeue(retry);
    }

    /// Set an item aside while penalized, then put a restamped copy back
    ///
    /// Sleeps at least until the item's own eligibility or one park interval,
    /// whichever is longer, but never past the end of the backoff window.
    async fn park(&self, item: DownloadItem, remaining: Duration) {
        self.shared.stats.record(Event::Parked);

        let until_eligible = item.eligible_at.saturating_duration_since(Instant::now());
        let nap = until_eligible
            .max(self.shared.settings.park_interval)
            .min(remaining);
        debug!(
            "Worker {} parking {} for {:?} ({:?} left in backoff window)",
            self.id, item.url, nap, remaining
        );

        self.sleep_until_or_stopped(Instant::now() + nap).await;
        self.shared
            .queue
            .requeue(item.restamped(self.shared.clock.current()));
    }

    /// Sleep until `deadline`; false if the manager stopped first
    async fn sleep_until_or_stopped(&self, deadline: Instant) -> bool {
        if deadline <= Instant::now() {
            return self.shared.is_alive();
        }
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => true,
            _ = stopped(self.liveness.clone()) => false,
        }
    }

    /// Invoke the user callback on the blocking pool, absorbing any failure
    async fn deliver(&self, item: &DownloadItem, meta: Option<ResponseMeta>, body: Bytes) {
        let callback = Arc::clone(&item.callback);
        let outcome = tokio::task::spawn_blocking(move || callback(meta, body)).await;
        self.shared.stats.record(Event::Delivered);

        let url = item.url.to_string();
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(CallbackError::Failed { url, source }),
            Err(join_error) if join_error.is_panic() => Some(CallbackError::Panicked {
                url,
                message: panic_message(join_error.into_panic()),
            }),
            Err(_) => Some(CallbackError::Cancelled { url }),
        };

        if let Some(e) = failure {
            self.shared.stats.record(Event::CallbackFailed);
            error!("Error occurred in user callback: {}", e);
        }
    }

    /// Get worker ID
    pub fn id(&self) -> u32 {
        self.id
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "non-string panic payload");
    }
}
