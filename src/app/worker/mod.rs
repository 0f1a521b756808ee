//! Download workers and the pool that runs them
//!
//! Every worker runs the same loop against the [`SharedState`] of one
//! download manager:
//!
//! 1. Claim an item with a timed pop, re-checking liveness on timeout
//! 2. Serve it from the content cache when possible
//! 3. Park it while the backoff controller is penalized
//! 4. Wait for its eligibility stamp and a wire slot
//! 5. Fetch, write the cache and hand the body to the callback
//! 6. On a transport failure trip backoff and requeue (or abandon)
//!
//! Callbacks run on the blocking pool. Their errors and panics are logged and
//! counted, never propagated to the worker.
//!
//! # Module Organization
//!
//! - [`core`] - Individual worker loop
//! - [`pool`] - Spawning and joining workers
//! - [`stats`] - Shared counters and their snapshot
//! - [`types`] - Shared state and worker settings

pub mod core;
pub mod pool;
pub mod stats;
pub mod types;

pub use self::core::DownloadWorker;
pub use pool::WorkerPool;
pub use stats::{Event, ManagerStats, StatsCounters};
pub use types::{SharedState, WorkerSettings};
