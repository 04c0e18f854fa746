// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Subcommands:
// - crawl: crawl a website and print the pages found
// - health: check whether a single URL is reachable
// - cache: inspect or clean the crawl cache
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cache::DEFAULT_CACHE_DIR;
use crate::crawl::{
    parse_domain_list, CrawlRequest, DomainRestriction, DEFAULT_DEPTH, DEFAULT_MAX_PAGES,
    DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

#[derive(Parser, Debug)]
#[command(
    name = "site-crawler",
    version = "0.1.0",
    about = "Crawl websites breadth-first with robots.txt compliance and result caching",
    long_about = "site-crawler walks a website wave by wave, up to a depth and page budget, \
                  following only the links your domain restriction allows. Results are cached \
                  on disk for 24 hours so repeated crawls are instant."
)]
pub struct Cli {
    /// Directory holding cached crawl results
    #[arg(long, global = true, env = "CRAWLER_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Show debug logs (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website starting from a URL
    ///
    /// Example: site-crawler crawl https://example.com --depth 2 --max-pages 50
    Crawl(CrawlArgs),

    /// Check whether a URL is reachable
    ///
    /// Example: site-crawler health https://example.com
    Health {
        /// URL to check
        url: String,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clean the crawl cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show how many entries are cached in memory and on disk
    Stats,
    /// Delete every cached crawl
    Clear,
    /// Delete cached crawls older than 24 hours
    Sweep,
}

#[derive(clap::Args, Debug)]
pub struct CrawlArgs {
    /// Website URL to start from (e.g., https://example.com)
    pub url: String,

    /// How many link hops to follow from the start page (1-10)
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Maximum number of pages to fetch (1-1000)
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Per-request timeout in seconds (5-300)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// "Stay in same domain", "Allow all domains" or "Custom domain list"
    #[arg(long, default_value = "Stay in same domain")]
    pub domain_restriction: DomainRestriction,

    /// Allowed domain for "Custom domain list" (repeatable, or newline separated)
    #[arg(long = "custom-domain")]
    pub custom_domains: Vec<String>,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Maximum number of requests in flight at once (1-50)
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Crawl pages even when robots.txt disallows them
    #[arg(long)]
    pub ignore_robots: bool,

    /// Skip the cache, always crawl fresh
    #[arg(long)]
    pub no_cache: bool,

    /// Output the full crawl report as JSON
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print each page's text content instead of a summary table
    #[arg(long)]
    pub text: bool,
}

impl CrawlArgs {
    pub fn to_request(&self) -> CrawlRequest {
        CrawlRequest {
            start_url: self.url.clone(),
            depth_limit: self.depth,
            max_pages: self.max_pages,
            timeout_seconds: self.timeout,
            domain_restriction: self.domain_restriction,
            custom_domains: parse_domain_list(&self.custom_domains),
            user_agent: self.user_agent.clone(),
            max_concurrency: self.max_workers,
            respect_robots: !self.ignore_robots,
            use_cache: !self.no_cache,
        }
    }
}
