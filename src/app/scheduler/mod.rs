//! Download manager: the public face of the scheduling engine
//!
//! The manager owns the shared state (queue, pacers, backoff controller,
//! content cache, fetch capability), starts the worker pool and optional
//! progress monitor at construction, and exposes submission and draining.
//!
//! # Architecture
//!
//! - [`config`] - Manager configuration and validation
//! - [`drain`] - Idle detection with settle and confirmation windows
//! - [`monitor`] - Remaining/ETA progress line
//! - [`signals`] - Ctrl+C/SIGTERM handling for [`DownloadManager::run`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use bulk_fetcher::app::{DownloadManager, ManagerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::default().with_base_url("https://example.org");
//! let manager = DownloadManager::new(config).await?;
//!
//! for page in ["/a", "/b", "c"] {
//!     manager.download(page, |meta, body| {
//!         let from_cache = meta.is_none();
//!         println!("{} bytes (cached: {})", body.len(), from_cache);
//!         Ok(())
//!     })?;
//! }
//!
//! let outcome = manager.run().await;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drain;
pub mod monitor;
pub mod signals;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::backoff::BackoffController;
use crate::app::cache::ContentCache;
use crate::app::client::{ClientConfig, Fetcher, HttpFetcher, ResponseMeta};
use crate::app::pacing::{SubmissionClock, WirePacer};
use crate::app::queue::{Callback, DownloadItem, WorkQueue};
use crate::app::worker::{Event, ManagerStats, SharedState, WorkerPool};
use crate::errors::{ConfigResult, SubmitError};

pub use config::ManagerConfig;
pub use drain::DrainOutcome;
pub use monitor::ProgressMonitor;
pub use signals::{create_shutdown_channel, wait_for_shutdown_signal, SignalHandler};

/// Concurrent, rate-limited bulk downloader
pub struct DownloadManager {
    config: ManagerConfig,
    handle: DownloadHandle,
    pool: Mutex<WorkerPool>,
    monitor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DownloadManager {
    /// Create a manager backed by the default HTTP transport
    ///
    /// Must be called from within a tokio runtime; workers start immediately.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid configuration, an unusable cache
    /// directory or an HTTP client that cannot be built.
    pub async fn new(config: ManagerConfig) -> ConfigResult<Self> {
        Self::with_client_config(config, ClientConfig::default()).await
    }

    /// Create a manager with a custom HTTP client configuration
    pub async fn with_client_config(
        config: ManagerConfig,
        client_config: ClientConfig,
    ) -> ConfigResult<Self> {
        let fetcher = HttpFetcher::new(client_config)?;
        Self::with_fetcher(config, Arc::new(fetcher)).await
    }

    /// Create a manager around any fetch capability
    pub async fn with_fetcher(config: ManagerConfig, fetcher: Arc<dyn Fetcher>) -> ConfigResult<Self> {
        config.validate()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let cache = ContentCache::from_dir(config.cache_dir.as_deref()).await?;

        let shared = Arc::new(SharedState::new(
            WorkQueue::new(),
            cache,
            fetcher,
            SubmissionClock::new(config.throttle),
            WirePacer::new(config.throttle),
            BackoffController::new(config.backoff_initial, config.backoff_increment),
            config.worker_settings(),
        ));

        let mut pool = WorkerPool::new(config.worker_count, Arc::clone(&shared));
        pool.start();

        let monitor = config.show_progress.then(|| {
            ProgressMonitor::new(
                Arc::clone(&shared),
                config.throttle,
                config.progress_interval,
            )
            .start()
        });

        info!(
            "Download manager started: {} workers, {:?} throttle, base {}, cache {}",
            config.worker_count,
            config.throttle,
            base_url,
            shared
                .cache
                .root()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        );

        Ok(Self {
            config,
            handle: DownloadHandle { base_url, shared },
            pool: Mutex::new(pool),
            monitor: parking_lot::Mutex::new(monitor),
        })
    }

    /// Queue `url` for download; `callback` receives the body once
    ///
    /// # Errors
    ///
    /// `SubmitError::InvalidUrl` if the resolved URL does not parse,
    /// `SubmitError::ShutDown` once the manager has stopped.
    pub fn download<F>(&self, url: &str, callback: F) -> Result<(), SubmitError>
    where
        F: Fn(Option<ResponseMeta>, Bytes) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handle.download(url, callback)
    }

    /// Queue `url` with an already shared callback
    pub fn submit(&self, url: &str, callback: Callback) -> Result<(), SubmitError> {
        self.handle.submit(url, callback)
    }

    /// Cloneable submission handle, usable from inside callbacks
    pub fn handle(&self) -> DownloadHandle {
        self.handle.clone()
    }

    /// Wait until every submitted item has been delivered or abandoned
    pub async fn wait_until_drained(&self) -> DrainOutcome {
        self.wait_until_drained_or(std::future::pending()).await
    }

    /// Like [`wait_until_drained`](Self::wait_until_drained), but gives up
    /// when `interrupt` resolves and marks the manager stopped
    pub async fn wait_until_drained_or<F>(&self, interrupt: F) -> DrainOutcome
    where
        F: Future<Output = ()>,
    {
        let shared = &self.handle.shared;
        let outcome = drain::drain(
            &shared.queue,
            self.config.drain_settle,
            self.config.drain_confirm,
            interrupt,
        )
        .await;

        match outcome {
            DrainOutcome::Drained => debug!("Download queue drained"),
            DrainOutcome::Interrupted { remaining } => {
                shared.stop();
                warn!("Drain interrupted with {} items outstanding", remaining);
            }
        }
        outcome
    }

    /// Drain with Ctrl+C/SIGTERM as the interrupt, then shut down
    pub async fn run(&self) -> DrainOutcome {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let signal_task = SignalHandler::new(shutdown_tx).setup();

        let outcome = self
            .wait_until_drained_or(wait_for_shutdown_signal(shutdown_rx))
            .await;
        signal_task.abort();

        if let DrainOutcome::Interrupted { remaining } = outcome {
            warn!("Terminated with {} incomplete downloads", remaining);
        }

        self.shutdown().await;
        outcome
    }

    /// Stop accepting work, stop the workers and monitor, and join them
    pub async fn shutdown(&self) {
        self.handle.shared.stop();
        self.pool.lock().await.shutdown().await;

        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }
    }

    /// Whether the manager still accepts and processes work
    pub fn is_alive(&self) -> bool {
        self.handle.shared.is_alive()
    }

    /// Items queued or in flight
    pub fn outstanding(&self) -> usize {
        self.handle.shared.queue.outstanding()
    }

    /// Whether fetches are currently suppressed by backoff
    pub fn is_penalized(&self) -> bool {
        self.handle.shared.backoff.is_penalized()
    }

    /// Snapshot of activity counters
    pub fn stats(&self) -> ManagerStats {
        self.handle.shared.stats.snapshot()
    }

    /// Content cache used by this manager
    pub fn cache(&self) -> &ContentCache {
        &self.handle.shared.cache
    }

    /// Active configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        // Detached workers exit on their next liveness check.
        self.handle.shared.stop();
    }
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("config", &self.config)
            .field("shared", &self.handle.shared)
            .finish_non_exhaustive()
    }
}

/// Submission side of a [`DownloadManager`]
#[derive(Clone)]
pub struct DownloadHandle {
    base_url: String,
    shared: Arc<SharedState>,
}

impl DownloadHandle {
    /// See [`DownloadManager::download`]
    pub fn download<F>(&self, url: &str, callback: F) -> Result<(), SubmitError>
    where
        F: Fn(Option<ResponseMeta>, Bytes) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.submit(url, Arc::new(callback))
    }

    /// See [`DownloadManager::submit`]
    pub fn submit(&self, url: &str, callback: Callback) -> Result<(), SubmitError> {
        if !self.shared.is_alive() {
            return Err(SubmitError::ShutDown);
        }

        let target = join_url(&self.base_url, url);
        let url = parse_target(&target)?;
        let eligible_at = self.shared.clock.assign();

        if self.shared.settings.verbose {
            info!(
                "Queueing {}, {} already in queue",
                target,
                self.shared.queue.len()
            );
        } else {
            debug!("Queueing {}", target);
        }

        self.shared.stats.record(Event::Submitted);
        self.shared
            .queue
            .push(DownloadItem::new(target, url, callback, eligible_at));
        Ok(())
    }

    /// Whether the owning manager still accepts work
    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }
}

impl std::fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Build the absolute URL string for a submission
///
/// `base` must already have its trailing slashes removed. Absolute `http://`
/// and `https://` URLs pass through, a leading `/` is appended to `base`, and
/// anything else is joined to `base` with a `/`. The result is not
/// normalized; it is the string the content cache is keyed on.
pub fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}

/// [`join_url`] followed by parsing
pub fn resolve_url(base: &str, url: &str) -> Result<Url, SubmitError> {
    parse_target(&join_url(base, url))
}

fn parse_target(target: &str) -> Result<Url, SubmitError> {
    Url::parse(target).map_err(|e| SubmitError::InvalidUrl {
        url: target.to_string(),
        reason: e.to_string(),
    })
}
