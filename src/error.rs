// src/error.rs
// =============================================================================
// Error types shared by the crawler and the cache.
//
// Two kinds of failure never show up here:
// - A single page failing to download (404, timeout, robots.txt block).
//   Those are collected into the crawl report and the crawl keeps going.
// - Cache read/write problems. Those are logged and treated as a cache miss.
//
// What does show up here is anything that stops a crawl before it starts.
// =============================================================================

use thiserror::Error;

/// Errors that prevent a crawl from running at all
#[derive(Debug, Error)]
pub enum CrawlError {
    /// One or more request parameters are out of range or malformed
    #[error("Invalid crawl parameters: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The shared HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors from the on-disk cache tier
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
