//! Core application logic for the bulk fetcher
//!
//! This module contains the scheduling engine and its collaborators: the
//! pacing clocks, the backoff controller, the content cache, the work queue,
//! the worker pool, the fetch capability and the download manager facade.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bulk_fetcher::app::{DownloadManager, DrainOutcome, ManagerConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::default()
//!     .with_base_url("http://localhost:8080")
//!     .with_worker_count(4)
//!     .with_throttle(Duration::from_millis(250));
//! let manager = DownloadManager::new(config).await?;
//!
//! manager.download("/index.html", |_meta, body| {
//!     println!("got {} bytes", body.len());
//!     Ok(())
//! })?;
//!
//! if let DrainOutcome::Interrupted { remaining } = manager.wait_until_drained().await {
//!     eprintln!("{} downloads left", remaining);
//! }
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod cache;
pub mod client;
pub mod hash;
pub mod pacing;
pub mod queue;
pub mod scheduler;
pub mod worker;

// Re-export main public API
pub use backoff::{BackoffController, BackoffWindow};
pub use cache::{CacheStats, ContentCache};
pub use client::{ClientConfig, FetchResponse, Fetcher, HttpFetcher, ResponseMeta, Session};
pub use hash::UrlDigest;
pub use pacing::{SubmissionClock, WirePacer};
pub use queue::{Callback, DownloadItem, WorkQueue};
pub use scheduler::{
    join_url, resolve_url, DownloadHandle, DownloadManager, DrainOutcome, ManagerConfig,
};
pub use worker::{ManagerStats, WorkerPool};
