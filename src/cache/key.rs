// src/cache/key.rs
// =============================================================================
// Cache keys.
//
// A key is the SHA-256 of every request field that changes what a crawl
// returns: start URL, depth, page budget, domain restriction, the custom
// domain list, user agent and the robots.txt switch.
//
// Fields that only affect *how fast* we crawl (timeout, concurrency) and the
// use_cache switch itself are left out, so changing them still hits the cache.
//
// SHA-256 rather than std's Hasher: the key names a file on disk and must be
// identical across processes, runs and Rust versions.
// =============================================================================

use sha2::{Digest, Sha256};

use crate::crawl::CrawlRequest;

pub fn cache_key(request: &CrawlRequest) -> String {
    let depth = request.depth_limit.to_string();
    let max_pages = request.max_pages.to_string();
    let custom_domains = request
        .custom_domains
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let parts: [&str; 7] = [
        &request.start_url,
        &depth,
        &max_pages,
        request.domain_restriction.label(),
        &custom_domains,
        &request.user_agent,
        if request.respect_robots { "robots" } else { "no-robots" },
    ];
    let canonical = parts.join("|");

    hex::encode(Sha256::digest(canonical.as_bytes()))
}
