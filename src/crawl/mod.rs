// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Submodules:
// - request: what to crawl (CrawlRequest) and parameter validation
// - queue: the frontier and the wave-by-wave crawl loop (Crawler)
// - fetch: one concurrent wave of HTTP GETs
// - html: link extraction and HTML-to-text conversion
// - policy: domain restriction rules
// - robots: robots.txt fetching and per-origin caching
//
// Rust concepts:
// - Modules: Organize code into namespaces
// - pub use: Re-export items so callers write `crawl::Crawler` instead of
//   `crawl::queue::Crawler`
// =============================================================================

mod fetch;
mod html;
mod policy;
mod queue;
mod request;
mod robots;

pub use html::html_to_text;
pub use queue::{CrawlReport, Crawler, PageResult};
pub use request::{
    parse_domain_list, CrawlRequest, DomainRestriction, DEFAULT_DEPTH, DEFAULT_MAX_PAGES,
    DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use robots::RobotsCache;
