//! On-disk content cache keyed by URL digest
//!
//! Every successfully fetched body is written to one file per URL, named by
//! the MD5 hex digest of the resolved URL string. Workers consult the cache before any
//! pacing or backoff gating, so a cached URL never touches the network.
//!
//! - [`manager`] - the [`ContentCache`] itself, with atomic writes
//! - [`stats`] - directory scanning for the `cache info` command
//!
//! # Examples
//!
//! ```rust,no_run
//! use bulk_fetcher::app::cache::ContentCache;
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ContentCache::open("./.web_cache").await?;
//! let url = "http://localhost/index.html";
//!
//! if !cache.has(url).await {
//!     cache.write(url, &Bytes::from_static(b"<html></html>")).await?;
//! }
//! assert!(cache.read(url).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod stats;

pub use manager::ContentCache;
pub use stats::{format_bytes, CacheStats};
