//! Command-line argument parsing for the bulk fetcher
//!
//! This module defines the CLI structure using clap derive macros: a `fetch`
//! command that feeds a URL list through the download manager, and `cache`
//! commands for inspecting and clearing the content cache.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// Bulk fetcher - polite concurrent downloads with backoff and caching
#[derive(Parser, Debug)]
#[command(
    name = "bulk_fetcher",
    version,
    about = "Download many URLs politely: paced, retried with backoff, cached on disk",
    long_about = "Fetches a list of URLs with a pool of concurrent workers.
Requests are spaced by a throttle interval, server errors trigger a growing global backoff
with a fresh cookie session, and every body is cached on disk keyed by the URL's MD5 digest."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (queueing and fetch events, progress line)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a list of URLs
    Fetch(FetchArgs),

    /// Content cache management
    Cache(CacheArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// File with one URL per line ("-" or omitted reads stdin)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Prefix for relative URLs
    #[arg(short, long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Number of concurrent download workers
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Minimum spacing between requests (e.g. "100ms", "1s")
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub throttle: Option<Duration>,

    /// Give up on a URL after this many failed fetches
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Write each body to this directory, named by the URL's MD5 digest
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Disable the on-disk content cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache location, entry count and size
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every cache entry and leftover temporary file
    Clear,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level implied by the verbosity flags, if any was given
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl FetchArgs {
    /// Whether URLs come from stdin
    pub fn reads_stdin(&self) -> bool {
        match &self.input {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}
