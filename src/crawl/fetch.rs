// src/crawl/fetch.rs
// =============================================================================
// The fetcher: downloads one wave of URLs concurrently.
//
// Key functionality:
// - Checks robots.txt before touching a URL (blocked URLs never get a GET)
// - Runs up to `max_concurrency` requests at once
// - Turns every outcome into a FetchOutcome, success or failure; one bad URL
//   never aborts the rest of the wave
// - Extracts candidate links from pages that are still above the depth limit
//
// The fetcher never touches the visited set. Deciding what gets crawled next
// is the frontier's job (queue.rs).
// =============================================================================

use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use reqwest::{Client, StatusCode};
use url::Url;

use super::html::extract_links;
use super::queue::FrontierEntry;
use super::request::CrawlRequest;
use super::robots::RobotsCache;

pub const ROBOTS_BLOCKED: &str = "Blocked by robots.txt";
pub const TIMED_OUT: &str = "Request timed out";

// What happened when we tried to fetch one URL
#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        url: Url,
        depth: usize,
        content: String,
        /// Empty when the page sits at the depth limit
        links: Vec<Url>,
    },
    Failure {
        url: String,
        reason: String,
    },
}

pub struct Fetcher<'a> {
    client: &'a Client,
    robots: &'a RobotsCache,
    request: &'a CrawlRequest,
}

impl<'a> Fetcher<'a> {
    pub fn new(client: &'a Client, robots: &'a RobotsCache, request: &'a CrawlRequest) -> Self {
        Self {
            client,
            robots,
            request,
        }
    }

    // Fetches every entry of a wave and waits for all of them
    //
    // Results come back in completion order, not batch order.
    pub async fn fetch_wave(&self, batch: &[FrontierEntry]) -> Vec<FetchOutcome> {
        stream::iter(batch.iter().map(|entry| self.fetch_one(entry)))
            .buffer_unordered(self.request.max_concurrency.max(1))
            .collect()
            .await
    }

    async fn fetch_one(&self, entry: &FrontierEntry) -> FetchOutcome {
        let url = match Url::parse(&entry.url) {
            Ok(url) => url,
            Err(e) => return failure(&entry.url, e.to_string()),
        };

        if self.request.respect_robots
            && !self
                .robots
                .is_allowed(self.client, &url, &self.request.user_agent)
                .await
        {
            return failure(&entry.url, ROBOTS_BLOCKED);
        }

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return failure(&entry.url, describe_error(&e)),
        };

        if response.status() != StatusCode::OK {
            return failure(&entry.url, format!("HTTP {}", response.status().as_u16()));
        }

        let content = match response.text().await {
            Ok(content) => content,
            Err(e) => return failure(&entry.url, describe_error(&e)),
        };

        let links = if entry.depth < self.request.depth_limit {
            extract_links(&content, &url)
        } else {
            Vec::new()
        };

        FetchOutcome::Success {
            url,
            depth: entry.depth,
            content,
            links,
        }
    }
}

fn failure(url: &str, reason: impl Into<String>) -> FetchOutcome {
    FetchOutcome::Failure {
        url: url.to_string(),
        reason: reason.into(),
    }
}

// Turns a reqwest error into the message recorded for the failed URL
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        TIMED_OUT.to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    }
}
