//! Bulk fetcher CLI application
//!
//! Command-line interface for downloading URL lists politely: paced requests,
//! global backoff on server errors, and an on-disk content cache.

use std::process;

use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use bulk_fetcher::cli::{handle_cache, handle_fetch, Cli, Commands};
use bulk_fetcher::config::AppConfig;
use bulk_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);
    info!("Bulk fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(&cli.global, config, args).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(&cli.global, config, args).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the config file
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .or_else(|| config.logging.level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("bulk_fetcher={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
