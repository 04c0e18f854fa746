// src/crawl/queue.rs
// =============================================================================
// This module implements website crawling with a breadth-first, wave-by-wave
// approach.
//
// How it works:
// 1. Check the cache; a fresh hit returns immediately with no network work
// 2. Seed wave 0 with the start URL
// 3. Fetch every URL in the wave concurrently and wait for all of them
// 4. Record successes as pages, failures in the error list
// 5. Filter the links found on successful pages (domain restriction, not yet
//    visited, page budget) into the next wave
// 6. Repeat until a wave comes out empty, then store the result in the cache
//
// The crawl is a small state machine:
//
//   Idle -> Fetching(0) -> Filtering(0) -> Fetching(1) -> ... -> Done
//
// A CancellationToken is checked before each wave starts. A cancelled crawl
// returns whatever it gathered so far and is never cached.
//
// Invariants:
// - visited.len() <= max_pages, always
// - a URL is admitted (and fetched) at most once per crawl
// - once visited.len() reaches max_pages no further wave starts; URLs
//   admitted into the pending wave are counted as visited but never fetched
// - the start page is always fetched, even with max_pages = 1
// - only the wave loop touches `visited`, and only between waves, so no
//   locking is needed
// =============================================================================

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::fetch::{FetchOutcome, Fetcher};
use super::policy::domain_allowed;
use super::request::CrawlRequest;
use super::robots::RobotsCache;
use crate::cache::{cache_key, CrawlCache};
use crate::error::CrawlError;

// A URL waiting to be fetched, and how many hops it is from the start URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

// One successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub content: String,
}

// One URL that could not be fetched, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
}

// Everything a caller gets back from a crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub start_url: String,
    /// Pages in discovery order (wave by wave)
    pub pages: Vec<PageResult>,
    pub failures: Vec<FetchFailure>,
    /// Number of distinct URLs admitted to the crawl
    pub visited: usize,
    pub waves: usize,
    pub from_cache: bool,
    pub cancelled: bool,
    pub duration_ms: u128,
}

// Visited set plus the page budget
struct Frontier {
    visited: HashSet<String>,
    max_pages: usize,
}

impl Frontier {
    // Creates the frontier and the first wave (just the start URL)
    fn seed(start_url: &str, max_pages: usize) -> (Self, Vec<FrontierEntry>) {
        let mut frontier = Frontier {
            visited: HashSet::new(),
            max_pages,
        };
        frontier.visited.insert(start_url.to_string());
        let batch = vec![FrontierEntry {
            url: start_url.to_string(),
            depth: 0,
        }];
        (frontier, batch)
    }

    fn is_full(&self) -> bool {
        self.visited.len() >= self.max_pages
    }

    // Marks `url` visited if it's new and the budget allows it
    fn admit(&mut self, url: &str) -> bool {
        if self.is_full() || self.visited.contains(url) {
            return false;
        }
        self.visited.insert(url.to_string())
    }
}

enum CrawlState {
    Idle,
    Fetching { wave: usize, batch: Vec<FrontierEntry> },
    Filtering { wave: usize, outcomes: Vec<FetchOutcome> },
    Done { waves: usize, cancelled: bool },
}

// Runs crawls against a cache and a robots.txt cache
//
// Both caches are injected so they can be shared between crawls (and
// swapped out in tests).
#[derive(Clone)]
pub struct Crawler {
    cache: CrawlCache,
    robots: RobotsCache,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(cache: CrawlCache) -> Self {
        Self {
            cache,
            robots: RobotsCache::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_robots(mut self, robots: RobotsCache) -> Self {
        self.robots = robots;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cache(&self) -> &CrawlCache {
        &self.cache
    }

    // Crawls a website according to `request`
    //
    // Returns:
    //   Ok(report) when the crawl ran (even if every page failed)
    //   Err(Validation) for bad parameters, before any network request
    //   Err(Client) if the HTTP client can't be built
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlReport, CrawlError> {
        let request = request.validate()?;
        let started = Instant::now();
        let key = cache_key(&request);

        if request.use_cache {
            if let Some(pages) = self.cache.lookup(&key) {
                tracing::info!(url = %request.start_url, pages = pages.len(), "cache hit");
                return Ok(CrawlReport {
                    start_url: request.start_url.clone(),
                    visited: pages.len(),
                    pages,
                    failures: Vec::new(),
                    waves: 0,
                    from_cache: true,
                    cancelled: false,
                    duration_ms: started.elapsed().as_millis(),
                });
            }
            tracing::debug!(url = %request.start_url, "cache miss");
        }

        tracing::info!(
            url = %request.start_url,
            depth = request.depth_limit,
            max_pages = request.max_pages,
            restriction = %request.domain_restriction,
            "crawl started"
        );

        let client = Client::builder()
            .user_agent(request.user_agent.as_str())
            .timeout(Duration::from_secs(request.timeout_seconds))
            .build()?;

        let mut report = self.run_waves(&client, &request).await;
        report.duration_ms = started.elapsed().as_millis();

        if request.use_cache && !report.cancelled && !report.pages.is_empty() {
            self.cache.store(&key, &report.pages);
            tracing::debug!(url = %request.start_url, %key, "crawl cached");
        }

        tracing::info!(
            url = %report.start_url,
            pages = report.pages.len(),
            failures = report.failures.len(),
            waves = report.waves,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms as u64,
            "crawl completed"
        );

        Ok(report)
    }

    async fn run_waves(&self, client: &Client, request: &CrawlRequest) -> CrawlReport {
        let fetcher = Fetcher::new(client, &self.robots, request);
        let (mut frontier, seed) = Frontier::seed(&request.start_url, request.max_pages);
        let mut seed = Some(seed);

        let mut pages = Vec::new();
        let mut failures = Vec::new();
        let mut state = CrawlState::Idle;

        let (waves, cancelled) = loop {
            state = match state {
                CrawlState::Idle => CrawlState::Fetching {
                    wave: 0,
                    batch: seed.take().unwrap_or_default(),
                },

                CrawlState::Fetching { wave, batch } => {
                    if batch.is_empty() {
                        CrawlState::Done { waves: wave, cancelled: false }
                    } else if wave > 0 && frontier.is_full() {
                        // Budget reached: admitted URLs still pending are dropped
                        tracing::debug!(wave, dropped = batch.len(), "page budget reached");
                        CrawlState::Done { waves: wave, cancelled: false }
                    } else if self.cancel.is_cancelled() {
                        tracing::info!(wave, pending = batch.len(), "crawl cancelled");
                        CrawlState::Done { waves: wave, cancelled: true }
                    } else {
                        tracing::debug!(wave, urls = batch.len(), "fetching wave");
                        let outcomes = fetcher.fetch_wave(&batch).await;
                        CrawlState::Filtering { wave, outcomes }
                    }
                }

                CrawlState::Filtering { wave, outcomes } => {
                    let mut next = Vec::new();
                    for outcome in outcomes {
                        match outcome {
                            FetchOutcome::Success { url, depth, content, links } => {
                                for link in links {
                                    if !domain_allowed(
                                        &link,
                                        &url,
                                        request.domain_restriction,
                                        &request.custom_domains,
                                    ) {
                                        continue;
                                    }
                                    let link = String::from(link);
                                    if frontier.admit(&link) {
                                        next.push(FrontierEntry { url: link, depth: depth + 1 });
                                    }
                                }
                                pages.push(PageResult { url: url.into(), content });
                            }
                            FetchOutcome::Failure { url, reason } => {
                                tracing::warn!(%url, error = %reason, "fetch failed");
                                failures.push(FetchFailure { url, error: reason });
                            }
                        }
                    }
                    tracing::debug!(
                        wave,
                        visited = frontier.visited.len(),
                        next = next.len(),
                        "wave filtered"
                    );
                    CrawlState::Fetching { wave: wave + 1, batch: next }
                }

                CrawlState::Done { waves, cancelled } => break (waves, cancelled),
            };
        };

        CrawlReport {
            start_url: request.start_url.clone(),
            pages,
            failures,
            visited: frontier.visited.len(),
            waves,
            from_cache: false,
            cancelled,
            duration_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::DomainRestriction;
    use chrono::Utc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn page(server: &MockServer, p: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn crawler(dir: &TempDir) -> Crawler {
        Crawler::new(CrawlCache::new(dir.path()))
    }

    fn urls(report: &CrawlReport) -> Vec<String> {
        let mut urls: Vec<String> = report.pages.iter().map(|p| p.url.clone()).collect();
        urls.sort();
        urls
    }

    #[test]
    fn test_frontier_budget_and_dedup() {
        let (mut frontier, batch) = Frontier::seed("https://a.test/", 3);
        assert_eq!(batch, vec![FrontierEntry { url: "https://a.test/".to_string(), depth: 0 }]);

        assert!(!frontier.admit("https://a.test/"));
        assert!(frontier.admit("https://a.test/x"));
        assert!(!frontier.admit("https://a.test/x"));
        assert!(frontier.admit("https://a.test/y"));
        assert!(!frontier.admit("https://a.test/z"));
        assert_eq!(frontier.visited.len(), 3);
    }

    // a.test links to a.test/x, a.test/y and b.test/z; depth 1, budget 3,
    // same domain. b.test is filtered out, x and y fill the budget, and the
    // crawl stops after the first wave without requesting them.
    #[tokio::test]
    async fn test_same_domain_crawl_stops_at_budget() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        page(
            &a,
            "/",
            &format!(
                r#"<a href="/x">x</a><a href="/y">y</a><a href="/w">w</a><a href="{}/z">z</a>"#,
                b.uri()
            ),
        )
        .await;
        for p in ["/x", "/y", "/w"] {
            Mock::given(path(p)).respond_with(ResponseTemplate::new(200)).expect(0).mount(&a).await;
        }
        Mock::given(path("/z")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&b).await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 1,
            max_pages: 3,
            respect_robots: false,
            use_cache: false,
            ..CrawlRequest::new(a.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        assert_eq!(report.visited, 3);
        assert_eq!(report.waves, 1);
        assert_eq!(urls(&report), vec![format!("{}/", a.uri())]);
        assert!(report.failures.is_empty());
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_budget_stop_leaves_room_for_later_waves() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/a">a</a>"#).await;
        page(&server, "/a", r#"<a href="/b">b</a><a href="/c">c</a>"#).await;
        page(&server, "/b", "b").await;
        Mock::given(path("/c")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 3,
            max_pages: 3,
            respect_robots: false,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        // Wave 1 (/a) starts with 2 of 3 slots used; /b fills the budget
        // during its filtering, so wave 2 never runs.
        assert_eq!(
            urls(&report),
            vec![format!("{}/", server.uri()), format!("{}/a", server.uri())]
        );
        assert_eq!(report.visited, 3);
        assert_eq!(report.waves, 2);
    }

    #[tokio::test]
    async fn test_depth_limit_stops_expansion() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/one">1</a>"#).await;
        page(&server, "/one", r#"<a href="/two">2</a>"#).await;
        Mock::given(path("/two")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 1,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        assert_eq!(urls(&report), vec![format!("{}/", server.uri()), format!("{}/one", server.uri())]);
        assert_eq!(report.waves, 2);
    }

    #[tokio::test]
    async fn test_pages_in_discovery_order_and_fetched_once() {
        let server = MockServer::start().await;
        // Cycle: / -> /a -> /b -> / and /b -> /a
        Mock::given(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/a">a</a><a href="/">self</a>"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/b">b</a>"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/b"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<a href="/">home</a><a href="/a#top">a</a>"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 5,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        let order: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
        let expected = [
            format!("{}/", server.uri()),
            format!("{}/a", server.uri()),
            format!("{}/b", server.uri()),
        ];
        assert_eq!(order, expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(report.visited, 3);
    }

    #[tokio::test]
    async fn test_javascript_links_never_fetched() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r##"<a href="javascript:void(0)">js</a><a href="mailto:a@b.c">m</a><a href="#top">t</a>"##,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 2,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        assert_eq!(report.visited, 1);
        assert_eq!(report.pages.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_max_pages_one_fetches_only_start() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/a">a</a>"#).await;
        Mock::given(path("/a")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 3,
            max_pages: 1,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();
        assert_eq!(urls(&report), vec![format!("{}/", server.uri())]);
        assert_eq!(report.visited, 1);
        assert_eq!(report.waves, 1);
    }

    #[tokio::test]
    async fn test_robots_blocked_link_recorded_as_failure() {
        let server = MockServer::start().await;
        page(&server, "/robots.txt", "User-agent: *\nDisallow: /private\n").await;
        page(&server, "/", r#"<a href="/private">p</a><a href="/public">ok</a>"#).await;
        page(&server, "/public", "public").await;
        Mock::given(path("/private")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(
            report.failures,
            vec![FetchFailure {
                url: format!("{}/private", server.uri()),
                error: "Blocked by robots.txt".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_ignoring_robots_fetches_everything() {
        let server = MockServer::start().await;
        page(&server, "/robots.txt", "User-agent: *\nDisallow: /\n").await;
        page(&server, "/", "home").await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            respect_robots: false,
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();
        assert_eq!(report.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_domain_restriction_modes_across_hosts() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        page(&a, "/", &format!(r#"<a href="/local">l</a><a href="{}/remote">r</a>"#, b.uri())).await;
        page(&a, "/local", "local").await;
        page(&b, "/remote", "remote").await;

        let dir = TempDir::new().unwrap();
        let crawler = crawler(&dir);
        let base = CrawlRequest {
            use_cache: false,
            ..CrawlRequest::new(a.uri())
        };

        let same = crawler.crawl(&base).await.unwrap();
        assert_eq!(same.pages.len(), 2);
        assert!(same.pages.iter().all(|p| p.url.starts_with(&a.uri())));

        let all = CrawlRequest {
            domain_restriction: DomainRestriction::AllowAll,
            ..base.clone()
        };
        assert_eq!(crawler.crawl(&all).await.unwrap().pages.len(), 3);

        let b_netloc = b.uri().trim_start_matches("http://").to_string();
        let custom = CrawlRequest {
            domain_restriction: DomainRestriction::CustomList,
            custom_domains: [b_netloc].into_iter().collect(),
            ..base.clone()
        };
        let report = crawler.crawl(&custom).await.unwrap();
        let mut expected = vec![format!("{}/", a.uri()), format!("{}/remote", b.uri())];
        expected.sort();
        assert_eq!(urls(&report), expected);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_crawl() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/gone">g</a><a href="/ok">o</a>"#).await;
        Mock::given(path("/gone")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        page(&server, "/ok", "ok").await;

        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        let report = crawler(&dir).crawl(&request).await.unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error, "HTTP 500");
    }

    #[tokio::test]
    async fn test_validation_error_before_network() {
        let dir = TempDir::new().unwrap();
        let request = CrawlRequest {
            depth_limit: 0,
            ..CrawlRequest::new("https://a.test")
        };
        let err = crawler(&dir).crawl(&request).await.unwrap_err();
        assert!(matches!(err, CrawlError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network_until_stale() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cached page"))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let crawler = crawler(&dir);
        let request = CrawlRequest::new(server.uri());

        let first = crawler.crawl(&request).await.unwrap();
        assert!(!first.from_cache);

        let second = crawler.crawl(&request).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.pages, first.pages);

        // Age the entry past the freshness window
        let key = cache_key(&request.validate().unwrap());
        crawler
            .cache()
            .store_at(&key, &first.pages, Utc::now() - chrono::Duration::hours(25));

        let third = crawler.crawl(&request).await.unwrap();
        assert!(!third.from_cache);
        assert_eq!(third.pages, first.pages);
    }

    #[tokio::test]
    async fn test_use_cache_false_always_fetches() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page"))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let crawler = crawler(&dir);
        let request = CrawlRequest {
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        crawler.crawl(&request).await.unwrap();
        crawler.crawl(&request).await.unwrap();
        assert_eq!(crawler.cache().stats().disk_entries, 0);
    }

    #[tokio::test]
    async fn test_cancelled_crawl_fetches_nothing_and_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(path("/")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let dir = TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let crawler = crawler(&dir).with_cancellation(token);

        let report = crawler.crawl(&CrawlRequest::new(server.uri())).await.unwrap();
        assert!(report.cancelled);
        assert!(report.pages.is_empty());
        assert_eq!(crawler.cache().stats().disk_entries, 0);
    }

    #[tokio::test]
    async fn test_shared_robots_cache_across_crawls() {
        let server = MockServer::start().await;
        Mock::given(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .expect(1)
            .mount(&server)
            .await;
        page(&server, "/", "home").await;

        let dir = TempDir::new().unwrap();
        let robots = RobotsCache::new();
        let crawler = crawler(&dir).with_robots(robots.clone());
        let request = CrawlRequest {
            use_cache: false,
            ..CrawlRequest::new(server.uri())
        };
        crawler.crawl(&request).await.unwrap();
        crawler.crawl(&request).await.unwrap();
        assert_eq!(robots.cached_origins().await, 1);
    }
}
