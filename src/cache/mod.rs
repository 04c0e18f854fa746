// src/cache/mod.rs
// =============================================================================
// This module memoizes finished crawls.
//
// Submodules:
// - key: turns a crawl request into a stable cache key
// - store: the memory + disk cache with its 24 hour freshness window
// =============================================================================

mod key;
mod store;

pub use key::cache_key;
pub use store::{CrawlCache, DEFAULT_CACHE_DIR};
