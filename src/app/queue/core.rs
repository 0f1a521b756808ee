//! Core work queue implementation
//!
//! Unordered FIFO shared by every worker. Besides the pending items the queue
//! tracks how many items are in flight (popped but not yet completed or
//! requeued) and publishes `pending + in_flight` through a `watch` channel,
//! which the drain logic uses as its idle signal.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::debug;

use super::types::DownloadItem;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<DownloadItem>,
    in_flight: usize,
}

impl QueueState {
    fn outstanding(&self) -> usize {
        self.pending.len() + self.in_flight
    }
}

/// Blocking pop-with-timeout queue with an idle signal
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    outstanding: watch::Sender<usize>,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            outstanding,
        }
    }

    /// Add a new item
    pub fn push(&self, item: DownloadItem) {
        {
            let mut state = self.state.lock();
            state.pending.push_back(item);
            self.publish(&state);
        }
        self.notify.notify_one();
    }

    /// Claim the next item without waiting
    pub fn try_pop(&self) -> Option<DownloadItem> {
        let mut state = self.state.lock();
        let item = state.pending.pop_front()?;
        state.in_flight += 1;
        self.publish(&state);
        Some(item)
    }

    /// Claim the next item, waiting up to `timeout` for one to arrive
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<DownloadItem> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    /// Put a claimed item back
    ///
    /// The replacement is pushed and the claim released under one lock, so
    /// the outstanding count never passes through zero.
    pub fn requeue(&self, item: DownloadItem) {
        {
            let mut state = self.state.lock();
            state.pending.push_back(item);
            state.in_flight = state.in_flight.saturating_sub(1);
            self.publish(&state);
        }
        self.notify.notify_one();
    }

    /// Release a claimed item for good (delivered or abandoned)
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.publish(&state);
    }

    /// Wake every task blocked in [`pop_timeout`](Self::pop_timeout)
    pub fn wake_all(&self) {
        self.notify.notify_waiters();
    }

    /// Items waiting to be claimed
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items claimed by workers and not yet released
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Pending plus in-flight items
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding()
    }

    /// Nothing queued and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0
    }

    /// Receiver for the outstanding count
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.outstanding.subscribe()
    }

    /// Resolve once nothing is queued or in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
    }

    fn publish(&self, state: &QueueState) {
        let outstanding = state.outstanding();
        let previous = self.outstanding.send_replace(outstanding);
        if previous != outstanding {
            debug!(
                "Queue outstanding {} -> {} ({} pending, {} in flight)",
                previous,
                outstanding,
                state.pending.len(),
                state.in_flight
            );
        }
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
