// src/cache/store.rs
// =============================================================================
// Two-tier cache for finished crawls.
//
// Tier 1: an in-memory HashMap, fast, gone when the process exits.
// Tier 2: one JSON file per key in the cache directory, survives restarts.
//
// lookup() tries memory first, then disk. A fresh entry found on disk is
// copied back into memory with its *original* timestamp, so promoting it
// doesn't extend its life.
//
// Entries are fresh for 24 hours. Stale entries are skipped on read but left
// where they are; sweep_expired() (or `site-crawler cache sweep`) deletes
// them.
//
// Any disk problem (unreadable file, bad JSON, full disk) is logged as a
// warning and treated as a miss. The cache never makes a crawl fail.
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::crawl::PageResult;
use crate::error::CacheError;

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const FRESHNESS_HOURS: i64 = 24;

// One cached crawl, exactly as written to <key>.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub results: Vec<PageResult>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp < Duration::hours(FRESHNESS_HOURS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub disk_entries: usize,
    pub cache_directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CrawlCache {
    dir: PathBuf,
    memory: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl CrawlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            memory: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Returns the cached pages for `key` if a fresh entry exists
    pub fn lookup(&self, key: &str) -> Option<Vec<PageResult>> {
        self.lookup_at(key, Utc::now())
    }

    pub fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<PageResult>> {
        if let Some(entry) = self.memory().get(key) {
            if entry.is_fresh(now) {
                return Some(entry.results.clone());
            }
        }

        let entry = match self.read_entry(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not load cache entry from disk");
                return None;
            }
        };

        if !entry.is_fresh(now) {
            return None;
        }

        let results = entry.results.clone();
        self.memory().insert(key.to_string(), entry);
        Some(results)
    }

    // Saves pages under `key` in memory and on disk
    pub fn store(&self, key: &str, results: &[PageResult]) {
        self.store_at(key, results, Utc::now());
    }

    pub fn store_at(&self, key: &str, results: &[PageResult], timestamp: DateTime<Utc>) {
        let entry = CacheEntry {
            key: key.to_string(),
            results: results.to_vec(),
            timestamp,
        };

        if let Err(e) = self.write_entry(&entry) {
            tracing::warn!(key, error = %e, "could not save cache entry to disk");
        }
        self.memory().insert(key.to_string(), entry);
    }

    // Drops every entry from memory and deletes every *.json file on disk
    //
    // Returns the number of files deleted.
    pub fn clear(&self) -> usize {
        self.memory().clear();

        let mut removed = 0;
        for path in self.json_files() {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not delete cache file"),
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory().len(),
            disk_entries: self.json_files().len(),
            cache_directory: self.dir.clone(),
        }
    }

    // Deletes stale and unreadable entries from both tiers
    //
    // Returns the number of disk files removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        self.memory().retain(|_, entry| entry.is_fresh(now));

        let mut removed = 0;
        for path in self.json_files() {
            let keep = matches!(read_entry_file(&path), Ok(entry) if entry.is_fresh(now));
            if keep {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not delete cache file"),
            }
        }
        removed
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_entry(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        match read_entry_file(&self.path_for(key)) {
            Ok(entry) => Ok(Some(entry)),
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(self.path_for(&entry.key), json)?;
        Ok(())
    }

    fn json_files(&self) -> Vec<PathBuf> {
        let Ok(dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        dir.filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect()
    }

    // A panic while holding the lock can't leave the map half-updated
    // (every mutation is a single HashMap call), so poisoning is ignored.
    fn memory(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_entry_file(path: &Path) -> Result<CacheEntry, CacheError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
