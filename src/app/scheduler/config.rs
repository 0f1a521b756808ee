//! Configuration for the download manager
//!
//! Every knob of the scheduling engine lives here. Durations are written in
//! humantime form (`"100ms"`, `"3s"`) when loaded from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::worker::WorkerSettings;
use crate::constants::{backoff, scheduler};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the download manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Prefix for relative URLs
    pub base_url: String,
    /// Number of concurrent workers
    pub worker_count: usize,
    /// Minimum spacing between consecutive fetches
    #[serde(with = "humantime_serde")]
    pub throttle: Duration,
    /// Log each queueing and fetch event at info level
    pub verbose: bool,
    /// On-disk content cache, `None` disables caching
    pub cache_dir: Option<PathBuf>,
    /// Failed fetches tolerated per item, `None` for unbounded
    pub max_retries: Option<u32>,
    /// First backoff penalty
    #[serde(with = "humantime_serde")]
    pub backoff_initial: Duration,
    /// Added to the doubled penalty on every trip
    #[serde(with = "humantime_serde")]
    pub backoff_increment: Duration,
    /// Longest a parked item sleeps before going back on the queue
    #[serde(with = "humantime_serde")]
    pub park_interval: Duration,
    /// Longest a worker blocks on an empty queue
    #[serde(with = "humantime_serde")]
    pub idle_poll: Duration,
    /// Upper bound on a single fetch
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Pause after the queue first goes idle before confirming
    #[serde(with = "humantime_serde")]
    pub drain_settle: Duration,
    /// Window over which the queue must stay idle to count as drained
    #[serde(with = "humantime_serde")]
    pub drain_confirm: Duration,
    /// Show the remaining/ETA line
    pub show_progress: bool,
    /// Refresh rate of the remaining/ETA line
    #[serde(with = "humantime_serde")]
    pub progress_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_url: scheduler::DEFAULT_BASE_URL.to_string(),
            worker_count: scheduler::DEFAULT_WORKER_COUNT,
            throttle: scheduler::DEFAULT_THROTTLE,
            verbose: false,
            cache_dir: Some(PathBuf::from(scheduler::DEFAULT_CACHE_DIR)),
            max_retries: None,
            backoff_initial: backoff::INITIAL_FACTOR,
            backoff_increment: backoff::FACTOR_INCREMENT,
            park_interval: scheduler::PARK_INTERVAL,
            idle_poll: scheduler::IDLE_POLL,
            fetch_timeout: scheduler::FETCH_TIMEOUT,
            drain_settle: scheduler::DRAIN_SETTLE,
            drain_confirm: scheduler::DRAIN_CONFIRM,
            show_progress: false,
            progress_interval: scheduler::PROGRESS_INTERVAL,
        }
    }
}

impl ManagerConfig {
    /// Set the base URL for relative submissions
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the number of workers
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the minimum spacing between fetches
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Enable or disable verbose logging; verbose also shows progress
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self.show_progress = verbose;
        self
    }

    /// Set or clear the cache directory
    pub fn with_cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Set the retry ceiling
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff penalty schedule
    pub fn with_backoff(mut self, initial: Duration, increment: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_increment = increment;
        self
    }

    /// Set how long a drain waits before and while confirming idleness
    pub fn with_drain_timing(mut self, settle: Duration, confirm: Duration) -> Self {
        self.drain_settle = settle;
        self.drain_confirm = confirm;
        self
    }

    /// Set the park and idle poll intervals
    pub fn with_poll_intervals(mut self, park: Duration, idle: Duration) -> Self {
        self.park_interval = park;
        self.idle_poll = idle;
        self
    }

    /// Set the per-fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Show or hide the remaining/ETA line
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Parse the base URL with trailing slashes removed
    pub fn parsed_base_url(&self) -> ConfigResult<Url> {
        let trimmed = self.base_url.trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.parsed_base_url()?;

        if self.worker_count == 0 || self.worker_count > scheduler::MAX_WORKER_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "worker_count".to_string(),
                value: self.worker_count.to_string(),
                reason: format!("Must be between 1 and {}", scheduler::MAX_WORKER_COUNT),
            });
        }

        let non_zero = [
            ("idle_poll", self.idle_poll),
            ("park_interval", self.park_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("progress_interval", self.progress_interval),
        ];
        for (field, value) in non_zero {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: "Must be greater than zero".to_string(),
                });
            }
        }

        let bounded = [
            ("throttle", self.throttle),
            ("idle_poll", self.idle_poll),
            ("park_interval", self.park_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("drain_settle", self.drain_settle),
            ("drain_confirm", self.drain_confirm),
            ("progress_interval", self.progress_interval),
        ];
        for (field, value) in bounded {
            if value > scheduler::MAX_INTERVAL {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: format!("Must not exceed {:?}", scheduler::MAX_INTERVAL),
                });
            }
        }

        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "cache_dir".to_string(),
                    value: String::new(),
                    reason: "Use no cache directory to disable caching".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Settings handed to each worker
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            idle_poll: self.idle_poll,
            park_interval: self.park_interval,
            fetch_timeout: self.fetch_timeout,
            max_retries: self.max_retries,
            verbose: self.verbose,
        }
    }
}
