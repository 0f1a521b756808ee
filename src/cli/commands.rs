//! Command handlers for the bulk fetcher CLI
//!
//! Handlers translate CLI arguments plus the loaded configuration into calls
//! on the download manager and the content cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::app::cache::format_bytes;
use crate::app::hash::UrlDigest;
use crate::app::{
    join_url, resolve_url, Callback, ContentCache, DownloadManager, DrainOutcome, ManagerConfig,
    ResponseMeta,
};
use crate::cli::{CacheAction, CacheArgs, FetchArgs, GlobalArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the fetch command
///
/// Reads the URL list, submits every entry to a download manager built from
/// the configuration plus CLI overrides, and drains it (Ctrl+C interrupts).
pub async fn handle_fetch(global: &GlobalArgs, config: AppConfig, args: FetchArgs) -> Result<()> {
    let start_time = Instant::now();
    let manager_config = fetch_manager_config(global, config.manager, &args);
    let base_url = manager_config.base_url.trim_end_matches('/').to_string();

    let urls = read_url_list(&args).await?;
    if urls.is_empty() {
        warn!("No URLs to fetch");
        if !global.quiet {
            println!("No URLs to fetch");
        }
        return Ok(());
    }
    info!("Fetching {} URLs", urls.len());

    if let Some(dir) = &args.output {
        tokio::fs::create_dir_all(dir).await?;
    }

    let manager = DownloadManager::with_client_config(manager_config, config.client).await?;

    let mut rejected = 0usize;
    for line in &urls {
        if let Err(e) = resolve_url(&base_url, line) {
            warn!("Skipping {}: {}", line, e);
            rejected += 1;
            continue;
        }
        let target = join_url(&base_url, line);
        let callback = report_callback(target, args.output.clone(), global.quiet);
        manager.submit(line, callback)?;
    }

    let outcome = manager.run().await;
    let stats = manager.stats();

    if !global.quiet {
        println!();
        println!("📊 Fetch Summary");
        println!("================");
        println!("Submitted: {}", stats.submitted);
        println!("Delivered: {} ({} from cache)", stats.delivered, stats.cache_hits);
        println!("Server errors: {}", stats.transport_errors);
        println!("Callback failures: {}", stats.callback_failures);
        if stats.abandoned > 0 {
            println!("Abandoned: {}", stats.abandoned);
        }
        if rejected > 0 {
            println!("Invalid URLs skipped: {}", rejected);
        }
        println!("Elapsed: {:.1}s", start_time.elapsed().as_secs_f64());
    }

    match outcome {
        DrainOutcome::Drained => Ok(()),
        DrainOutcome::Interrupted { remaining } => Err(AppError::generic(format!(
            "Terminated with {} incomplete downloads",
            remaining
        ))),
    }
}

/// Handle cache management commands
pub async fn handle_cache(global: &GlobalArgs, config: AppConfig, args: CacheArgs) -> Result<()> {
    let Some(cache_dir) = global.cache_dir.clone().or(config.manager.cache_dir) else {
        println!("Caching is disabled in the configuration");
        return Ok(());
    };
    let cache = ContentCache::open(cache_dir).await?;

    match args.action {
        CacheAction::Info { json } => handle_cache_info(&cache, json).await,
        CacheAction::Clear => handle_cache_clear(&cache).await,
    }
}

async fn handle_cache_info(cache: &ContentCache, json: bool) -> Result<()> {
    let stats = cache.stats().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::generic(format!("Failed to render cache stats: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("💾 Cache Information");
    println!("===================");
    if let Some(root) = &stats.cache_root {
        println!("Location: {}", root.display());
    }
    println!("Cached entries: {}", stats.entry_count);
    println!("Cache size: {}", stats.format_total_size());
    if stats.stale_temp_files > 0 {
        println!("Leftover temporary files: {}", stats.stale_temp_files);
    }
    Ok(())
}

async fn handle_cache_clear(cache: &ContentCache) -> Result<()> {
    let removed = cache.clear().await?;
    println!("🧹 Removed {} cache files", removed);
    Ok(())
}

/// Apply CLI overrides on top of the file configuration
fn fetch_manager_config(
    global: &GlobalArgs,
    mut config: ManagerConfig,
    args: &FetchArgs,
) -> ManagerConfig {
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(throttle) = args.throttle {
        config.throttle = throttle;
    }
    if args.max_retries.is_some() {
        config.max_retries = args.max_retries;
    }
    if let Some(dir) = &global.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if args.no_cache {
        config.cache_dir = None;
    }
    if global.verbose || global.very_verbose {
        config.verbose = true;
        config.show_progress = true;
    }
    if global.quiet {
        config.show_progress = false;
    }
    config
}

/// Read URLs from the input file or stdin, skipping blanks and `#` comments
async fn read_url_list(args: &FetchArgs) -> Result<Vec<String>> {
    let content = match &args.input {
        Some(path) if !args.reads_stdin() => tokio::fs::read_to_string(path).await?,
        _ => {
            debug!("Reading URLs from stdin");
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            buffer
        }
    };
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Callback that reports each delivery and optionally saves the body
fn report_callback(url: String, output: Option<PathBuf>, quiet: bool) -> Callback {
    Arc::new(move |meta: Option<ResponseMeta>, body: Bytes| {
        if let Some(dir) = &output {
            save_body(dir, &url, &body)?;
        }
        if !quiet {
            let source = meta
                .map(|m| m.status.to_string())
                .unwrap_or_else(|| "cached".to_string());
            println!("{}\t{}\t{}", source, format_bytes(body.len() as u64), url);
        }
        Ok(())
    })
}

fn save_body(dir: &Path, url: &str, body: &Bytes) -> anyhow::Result<()> {
    let path = dir.join(UrlDigest::of_str(url).to_hex());
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))
}
