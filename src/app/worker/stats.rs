//! Counters shared by all workers and the submission path

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters, updated lock-free
#[derive(Debug, Default)]
pub struct StatsCounters {
    submitted: AtomicU64,
    cache_hits: AtomicU64,
    fetched: AtomicU64,
    delivered: AtomicU64,
    callback_failures: AtomicU64,
    transport_errors: AtomicU64,
    requeued: AtomicU64,
    parked: AtomicU64,
    abandoned: AtomicU64,
}

/// Which counter to bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Submitted,
    CacheHit,
    Fetched,
    Delivered,
    CallbackFailed,
    TransportError,
    Requeued,
    Parked,
    Abandoned,
}

impl StatsCounters {
    pub fn record(&self, event: Event) {
        let counter = match event {
            Event::Submitted => &self.submitted,
            Event::CacheHit => &self.cache_hits,
            Event::Fetched => &self.fetched,
            Event::Delivered => &self.delivered,
            Event::CallbackFailed => &self.callback_failures,
            Event::TransportError => &self.transport_errors,
            Event::Requeued => &self.requeued,
            Event::Parked => &self.parked,
            Event::Abandoned => &self.abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> ManagerStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        ManagerStats {
            submitted: load(&self.submitted),
            cache_hits: load(&self.cache_hits),
            fetched: load(&self.fetched),
            delivered: load(&self.delivered),
            callback_failures: load(&self.callback_failures),
            transport_errors: load(&self.transport_errors),
            requeued: load(&self.requeued),
            parked: load(&self.parked),
            abandoned: load(&self.abandoned),
        }
    }
}

/// Snapshot of download manager activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    /// Items accepted by `download`
    pub submitted: u64,
    /// Items served from the content cache
    pub cache_hits: u64,
    /// Successful network fetches
    pub fetched: u64,
    /// Callback invocations (successful or not)
    pub delivered: u64,
    /// Callbacks that returned an error or panicked
    pub callback_failures: u64,
    /// Failed fetches (each one trips backoff)
    pub transport_errors: u64,
    /// Items put back after a failed fetch
    pub requeued: u64,
    /// Items set aside while penalized
    pub parked: u64,
    /// Items dropped past the retry ceiling
    pub abandoned: u64,
}

impl ManagerStats {
    /// Fraction of deliveries served from cache, 0.0 when nothing delivered
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.delivered as f64
        }
    }

    /// Submitted items that have neither been delivered nor abandoned
    pub fn unfinished(&self) -> u64 {
        self.submitted
            .saturating_sub(self.delivered)
            .saturating_sub(self.abandoned)
    }
}
