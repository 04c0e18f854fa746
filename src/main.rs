// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so JSON output on stdout stays clean)
// 3. Dispatch to the appropriate subcommand handler
// 4. Print results and exit with a proper code:
//    0 = success, 1 = pages failed or nothing crawled, 2 = error
// =============================================================================

mod cache; // src/cache/ - crawl result caching
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - the crawler itself
mod error; // src/error.rs - error types
mod health; // src/health.rs - single URL reachability check
mod logging; // src/logging.rs - tracing setup

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cache::CrawlCache;
use cli::{CacheAction, Cli, Commands, CrawlArgs};
use crawl::{html_to_text, CrawlReport, Crawler, RobotsCache};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let cache = CrawlCache::new(&cli.cache_dir);

    match cli.command {
        Commands::Crawl(args) => handle_crawl(cache, &args).await,
        Commands::Health { url, json } => handle_health(&url, json).await,
        Commands::Cache { action } => handle_cache(&cache, action),
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(cache: CrawlCache, args: &CrawlArgs) -> Result<i32> {
    let request = args.to_request();

    // Ctrl-C stops the crawl after the current wave instead of killing it
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current wave...");
            on_ctrl_c.cancel();
        }
    });

    let robots = RobotsCache::new();
    let crawler = Crawler::new(cache)
        .with_robots(robots.clone())
        .with_cancellation(cancel);

    let report = crawler.crawl(&request).await?;
    tracing::debug!(
        origins = robots.cached_origins().await,
        cache_dir = %crawler.cache().dir().display(),
        "crawl finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.text {
        print_text(&report);
    } else {
        print_table(&report);
    }

    if report.pages.is_empty() || !report.failures.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'health' subcommand
async fn handle_health(url: &str, json: bool) -> Result<i32> {
    let client = health::health_client(crawl::DEFAULT_USER_AGENT)
        .context("could not build HTTP client")?;
    let report = health::check_url_health(&client, url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let status = report
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("URL:        {}", report.url);
        println!("Status:     {}", status);
        println!("Accessible: {}", if report.accessible { "yes" } else { "no" });
        println!("Final URL:  {}", report.final_url);
        if let Some(error) = &report.error {
            println!("Error:      {}", error);
        }
    }

    Ok(if report.accessible { 0 } else { 1 })
}

// Handles the 'cache' subcommands
fn handle_cache(cache: &CrawlCache, action: CacheAction) -> Result<i32> {
    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("Cache directory: {}", stats.cache_directory.display());
            println!("Memory entries:  {}", stats.memory_entries);
            println!("Disk entries:    {}", stats.disk_entries);
        }
        CacheAction::Clear => {
            let removed = cache.clear();
            println!("Removed {} cached crawl(s) from {}", removed, cache.dir().display());
        }
        CacheAction::Sweep => {
            let removed = cache.sweep_expired();
            println!("Removed {} expired cached crawl(s)", removed);
        }
    }
    Ok(0)
}

// Prints a summary table of the crawl
fn print_table(report: &CrawlReport) {
    let source = if report.from_cache { " (from cache)" } else { "" };
    println!("Crawl of {}{}", report.start_url, source);
    println!();

    println!("{:<70} {:>10}", "URL", "BYTES");
    println!("{}", "=".repeat(81));
    for page in &report.pages {
        println!("{:<70} {:>10}", truncate(&page.url, 70), page.content.len());
    }

    if !report.failures.is_empty() {
        println!();
        println!("{:<70} {}", "FAILED URL", "ERROR");
        println!("{}", "=".repeat(81));
        for failure in &report.failures {
            println!("{:<70} {}", truncate(&failure.url, 70), failure.error);
        }
    }

    println!();
    println!("Summary:");
    println!("   Pages:    {}", report.pages.len());
    println!("   Failures: {}", report.failures.len());
    println!("   Visited:  {}", report.visited);
    println!("   Waves:    {}", report.waves);
    println!("   Time:     {} ms", report.duration_ms);
    if report.cancelled {
        println!("   (cancelled before the crawl finished)");
    }
}

// Prints every page as plain text
fn print_text(report: &CrawlReport) {
    for page in &report.pages {
        println!("=== {}", page.url);
        println!("{}", html_to_text(&page.content));
        println!();
    }
}

// Shortens long URLs for the table, keeping char boundaries intact
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
