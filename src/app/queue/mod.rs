//! Work queue shared by the worker pool
//!
//! Workers claim items with a timed pop so they can re-check liveness while
//! the queue is empty. Every claim is released exactly once, either with
//! [`WorkQueue::complete`] or by handing a replacement to
//! [`WorkQueue::requeue`]. The outstanding count (pending plus claimed) is
//! published on a `watch` channel and drives the drain logic.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bulk_fetcher::app::queue::{Callback, DownloadItem, WorkQueue};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = WorkQueue::new();
//! let callback: Callback = Arc::new(|_meta, body| {
//!     println!("{} bytes", body.len());
//!     Ok(())
//! });
//! let target = "http://localhost/a".to_string();
//! let url = Url::parse(&target)?;
//! queue.push(DownloadItem::new(
//!     target,
//!     url,
//!     callback,
//!     tokio::time::Instant::now(),
//! ));
//!
//! while let Some(item) = queue.pop_timeout(Duration::from_millis(200)).await {
//!     // fetch item.url ...
//!     let _ = item;
//!     queue.complete();
//! }
//! queue.wait_idle().await;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod types;

pub use self::core::WorkQueue;
pub use types::{Callback, DownloadItem};
