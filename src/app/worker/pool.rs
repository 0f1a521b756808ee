//! Worker pool lifecycle
//!
//! The pool spawns one tokio task per worker at start and joins them all on
//! shutdown. Workers stop on their own once the shared liveness flag flips,
//! so shutting down is just flipping the flag and awaiting the handles.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::core::DownloadWorker;
use super::types::SharedState;

/// Current state of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    /// Pool has been created but not started
    Created,
    /// Pool is running with active workers
    Running,
    /// Pool has been shut down
    Shutdown,
}

/// Pool for managing multiple download workers
#[derive(Debug)]
pub struct WorkerPool {
    worker_count: usize,
    shared: Arc<SharedState>,
    handles: Vec<JoinHandle<()>>,
    state: PoolState,
}

impl WorkerPool {
    /// Create a new worker pool
    pub fn new(worker_count: usize, shared: Arc<SharedState>) -> Self {
        Self {
            worker_count,
            shared,
            handles: Vec::with_capacity(worker_count),
            state: PoolState::Created,
        }
    }

    /// Spawn all workers; a no-op unless the pool is freshly created
    pub fn start(&mut self) {
        if self.state != PoolState::Created {
            warn!("Ignoring start of worker pool in state {:?}", self.state);
            return;
        }

        for worker_id in 0..self.worker_count {
            let worker = DownloadWorker::new(worker_id as u32, Arc::clone(&self.shared));
            self.handles.push(tokio::spawn(worker.run()));
        }

        self.state = PoolState::Running;
        debug!("Worker pool started with {} workers", self.worker_count);
    }

    /// Stop every worker and wait for them to exit
    ///
    /// In-flight fetches run to completion; items not yet fetched stay queued.
    pub async fn shutdown(&mut self) {
        if self.state == PoolState::Shutdown {
            return;
        }

        self.shared.stop();
        let handles = std::mem::take(&mut self.handles);
        let results = join_all(handles).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("{} workers ended abnormally during shutdown", failed);
        }

        self.state = PoolState::Shutdown;
        info!("Worker pool shutdown complete");
    }
}
