//! Content cache with atomic writes
//!
//! Entries are written to a uniquely named temp file inside the cache
//! directory and renamed into place, so readers never observe a partially
//! written body. Concurrent writes of the same URL are last-write-wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use super::stats::{self, CacheStats, EntryKind};
use crate::app::hash::UrlDigest;
use crate::constants::cache as cache_constants;
use crate::errors::{CacheError, CacheResult};

/// URL → body store on stable storage
///
/// Entries are keyed by the resolved URL string exactly as submitted, so two
/// spellings the url crate would normalize to the same URL stay distinct.
///
/// A cache built with [`ContentCache::disabled`] answers every lookup with a
/// miss and silently drops writes.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: Option<PathBuf>,
    temp_counter: Arc<AtomicU64>,
}

impl ContentCache {
    /// Open (and create if missing) a cache rooted at `dir`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DirectoryNotAccessible` if the directory cannot be
    /// created or the path exists but is not a directory.
    pub async fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = dir.into();

        fs::create_dir_all(&root)
            .await
            .map_err(|source| CacheError::DirectoryNotAccessible {
                path: root.clone(),
                source,
            })?;

        let metadata =
            fs::metadata(&root)
                .await
                .map_err(|source| CacheError::DirectoryNotAccessible {
                    path: root.clone(),
                    source,
                })?;
        if !metadata.is_dir() {
            return Err(CacheError::DirectoryNotAccessible {
                path: root,
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "path exists and is not a directory",
                ),
            });
        }

        info!("Content cache enabled at {}", root.display());
        Ok(Self {
            root: Some(root),
            temp_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        Self {
            root: None,
            temp_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open the configured directory, or build a disabled cache for `None`
    pub async fn from_dir(dir: Option<&Path>) -> CacheResult<Self> {
        match dir {
            Some(dir) => Self::open(dir).await,
            None => {
                debug!("No cache directory configured, caching disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Whether a cache directory is configured
    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Cache directory, if enabled
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// On-disk location of the entry for `url`
    pub fn entry_path(&self, url: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(UrlDigest::of_str(url).to_hex()))
    }

    /// Check whether `url` has a cached body
    pub async fn has(&self, url: &str) -> bool {
        match self.entry_path(url) {
            Some(path) => fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Read the cached body for `url`, `None` on a miss
    pub async fn read(&self, url: &str) -> CacheResult<Option<Bytes>> {
        let Some(path) = self.entry_path(url) else {
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Store `body` as the cached content of `url`
    pub async fn write(&self, url: &str, body: &Bytes) -> CacheResult<()> {
        let (Some(root), Some(final_path)) = (self.root.as_ref(), self.entry_path(url)) else {
            return Ok(());
        };

        let temp_path = root.join(format!(
            "{}{}-{}",
            cache_constants::TEMP_FILE_PREFIX,
            UrlDigest::of_str(url),
            self.temp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(source) = fs::write(&temp_path, body).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Io {
                path: temp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Io {
                path: final_path,
                source,
            });
        }

        debug!("Cached {} bytes for {}", body.len(), url);
        Ok(())
    }

    /// Count entries and bytes in the cache directory
    pub async fn stats(&self) -> CacheResult<CacheStats> {
        let Some(root) = self.root.clone() else {
            return Ok(CacheStats::default());
        };

        let scan_root = root.clone();
        tokio::task::spawn_blocking(move || stats::scan_directory(&scan_root))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
            .map_err(|source| CacheError::Io { path: root, source })
    }

    /// Remove every cached entry and leftover temp file
    ///
    /// Files that are neither entries nor temp files are left alone. Returns
    /// the number of files removed.
    pub async fn clear(&self) -> CacheResult<usize> {
        let Some(root) = self.root.as_ref() else {
            return Ok(0);
        };

        let io_err = |source| CacheError::Io {
            path: root.clone(),
            source,
        };

        let mut removed = 0;
        let mut entries = fs::read_dir(root).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if classify_file(&entry).await == EntryKind::Foreign {
                continue;
            }
            fs::remove_file(&path)
                .await
                .map_err(|source| CacheError::Io { path, source })?;
            removed += 1;
        }

        info!("Removed {} cache files from {}", removed, root.display());
        Ok(removed)
    }
}

async fn classify_file(entry: &fs::DirEntry) -> EntryKind {
    match entry.file_type().await {
        Ok(file_type) if file_type.is_file() => stats::classify(&entry.path()),
        _ => EntryKind::Foreign,
    }
}
