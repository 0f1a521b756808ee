//! Cache statistics and disk usage
//!
//! Scans the flat cache directory and counts entries whose file name is a
//! valid URL digest. Temp files from interrupted writes are reported
//! separately so `cache clear` can sweep them too.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::app::hash::UrlDigest;
use crate::constants::cache as cache_constants;

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Cache root directory (`None` when caching is disabled)
    pub cache_root: Option<PathBuf>,
    /// Number of cached entries
    pub entry_count: usize,
    /// Total size of cached bodies in bytes
    pub total_bytes: u64,
    /// Leftover temp files from interrupted writes
    pub stale_temp_files: usize,
}

impl CacheStats {
    /// Format cache size in human-readable format
    pub fn format_total_size(&self) -> String {
        format_bytes(self.total_bytes)
    }
}

/// Kind of file found in the cache directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Entry,
    TempFile,
    Foreign,
}

/// Classify a directory entry by its file name
pub(crate) fn classify(path: &Path) -> EntryKind {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return EntryKind::Foreign;
    };
    if name.starts_with(cache_constants::TEMP_FILE_PREFIX) {
        EntryKind::TempFile
    } else if UrlDigest::from_hex(name).is_some() {
        EntryKind::Entry
    } else {
        EntryKind::Foreign
    }
}

/// Scan a cache directory (blocking; call from `spawn_blocking`)
pub(crate) fn scan_directory(root: &Path) -> std::io::Result<CacheStats> {
    let mut stats = CacheStats {
        cache_root: Some(root.to_path_buf()),
        ..Default::default()
    };

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        match classify(&entry.path()) {
            EntryKind::Entry => {
                stats.entry_count += 1;
                stats.total_bytes += metadata.len();
            }
            EntryKind::TempFile => stats.stale_temp_files += 1,
            EntryKind::Foreign => {}
        }
    }

    Ok(stats)
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
