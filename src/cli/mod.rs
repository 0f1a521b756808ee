//! Command-line interface components
//!
//! Argument parsing and command handlers for the `bulk_fetcher` binary.

pub mod args;
pub mod commands;

pub use args::{CacheAction, CacheArgs, Cli, Commands, FetchArgs, GlobalArgs};
pub use commands::{handle_cache, handle_fetch};
