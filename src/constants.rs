//! Application constants for the bulk fetcher
//!
//! Defaults are grouped by the component that consumes them.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("bulk-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 25;
}

/// Scheduler defaults
pub mod scheduler {
    use super::Duration;

    /// Base URL for relative submissions
    pub const DEFAULT_BASE_URL: &str = "http://localhost";

    /// Number of concurrent workers
    pub const DEFAULT_WORKER_COUNT: usize = 10;

    /// Upper bound accepted by validation
    pub const MAX_WORKER_COUNT: usize = 256;

    /// Upper bound accepted for any pacing, polling or drain interval
    pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Minimum spacing between consecutive requests
    pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

    /// Cache directory used when none is configured explicitly
    pub const DEFAULT_CACHE_DIR: &str = "./.web_cache";

    /// How long an idle worker waits on the queue before re-checking liveness
    pub const IDLE_POLL: Duration = Duration::from_millis(200);

    /// Longest single sleep of a parked item during a backoff window
    pub const PARK_INTERVAL: Duration = Duration::from_millis(200);

    /// Per-request timeout applied by the worker around the fetch capability
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

    /// Short wait after the queue first reports idle
    pub const DRAIN_SETTLE: Duration = Duration::from_millis(250);

    /// Confirmation window the queue must stay idle across
    pub const DRAIN_CONFIRM: Duration = Duration::from_secs(1);

    /// Refresh interval of the remaining/ETA line
    pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
}

/// Backoff controller defaults
pub mod backoff {
    use super::Duration;

    /// Penalty applied on the first trip
    pub const INITIAL_FACTOR: Duration = Duration::from_secs(3);

    /// Constant added after doubling on every trip
    pub const FACTOR_INCREMENT: Duration = Duration::from_secs(2);

    /// Longest window a single trip can impose; the factor itself keeps growing
    pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Cache file constants
pub mod cache {
    /// Prefix of in-progress temp files inside the cache directory
    pub const TEMP_FILE_PREFIX: &str = ".tmp-";
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE_NAME: &str = "bulk-fetcher.toml";

    /// Directory name under the user config dir
    pub const APP_DIR_NAME: &str = "bulk-fetcher";
}

// Re-export commonly used constants at module level
pub use http::USER_AGENT;
pub use scheduler::{DEFAULT_THROTTLE, DEFAULT_WORKER_COUNT};
