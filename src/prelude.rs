//! Prelude module for the bulk fetcher library
//!
//! Re-exports the items most integrations need, so a single
//! `use bulk_fetcher::prelude::*;` covers the common case.
//!
//! ```rust,no_run
//! use bulk_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = DownloadManager::new(ManagerConfig::default()).await?;
//!     manager.download("/robots.txt", |_, body| {
//!         println!("{}", String::from_utf8_lossy(&body));
//!         Ok(())
//!     })?;
//!     manager.run().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components
pub use crate::app::{
    Callback, ClientConfig, ContentCache, DownloadHandle, DownloadManager, DrainOutcome,
    Fetcher, ManagerConfig, ManagerStats, ResponseMeta,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_THROTTLE, DEFAULT_WORKER_COUNT, USER_AGENT};

pub use bytes::Bytes;
pub use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let config = ManagerConfig::default();
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
        assert_eq!(config.throttle, DEFAULT_THROTTLE);
        assert!(ClientConfig::default().user_agent == USER_AGENT);

        let callback: Callback = Arc::new(|_, body: Bytes| {
            assert!(body.is_empty());
            Ok(())
        });
        assert!(callback(None, Bytes::new()).is_ok());
    }
}
