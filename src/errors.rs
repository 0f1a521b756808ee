//! Error types for the bulk fetcher
//!
//! Each concern gets its own error enum. Only [`ConfigError`] is ever fatal:
//! transport and callback failures are absorbed by the worker pool, and
//! [`SubmitError`] is returned to the caller of `download` for inputs that can
//! never be fetched.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the fetch capability (network, server or protocol level)
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error from the underlying client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error: HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The fetch did not complete in time
    #[error("Fetch timed out after {after:?}")]
    Timeout { after: Duration },
}

impl TransportError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Content cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or is not a directory
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error reading or writing a cache entry
    #[error("Cache I/O error for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Blocking cache task failed to complete
    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Configuration errors, fatal at construction time
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Base URL does not parse or is not http(s)
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Cache directory unusable
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// HTTP client could not be built
    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors returned to the caller of `download`
#[derive(Error, Debug)]
pub enum SubmitError {
    /// URL could not be resolved into an absolute http(s) URL
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The manager no longer accepts work
    #[error("Download manager has been shut down")]
    ShutDown,
}

/// Failures raised by user callbacks; logged, never propagated
#[derive(Error, Debug)]
pub enum CallbackError {
    /// Callback returned an error
    #[error("Callback failed for {url}: {source:#}")]
    Failed {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// Callback panicked
    #[error("Callback panicked for {url}: {message}")]
    Panicked { url: String, message: String },

    /// Callback task was cancelled before finishing
    #[error("Callback cancelled for {url}")]
    Cancelled { url: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Submission error
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Callback error
    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "transport",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Submit(_) => "submit",
            AppError::Callback(_) => "callback",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
