//! Bulk Fetcher Library
//!
//! Concurrent, rate-limited bulk URL fetching. Submitted URLs are spaced by a
//! throttle interval, fetched by a pool of workers, retried after a growing
//! global backoff when the server fails, cached on disk by URL digest and
//! handed to a per-URL callback exactly once.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
