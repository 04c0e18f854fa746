// src/crawl/request.rs
// =============================================================================
// The crawl request: every knob a caller can turn, plus validation.
//
// A CrawlRequest is built once (from the CLI, or directly in tests), checked
// by validate(), and then never changes while the crawl runs.
//
// Validation is fail-fast: every problem is collected and returned together
// as CrawlError::Validation before any network request is made.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::CrawlError;

pub const DEFAULT_DEPTH: usize = 1;
pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const DEPTH_RANGE: (usize, usize) = (1, 10);
const MAX_PAGES_RANGE: (usize, usize) = (1, 1000);
const TIMEOUT_RANGE: (u64, u64) = (5, 300);
const WORKERS_RANGE: (usize, usize) = (1, 50);

// Substrings that are never acceptable in a start URL
const DANGEROUS_PATTERNS: [&str; 4] = ["javascript:", "data:", "vbscript:", "<script"];

// Which link hosts are eligible for crawling
//
// The string forms are the labels the original UI offered, so the same
// values can be passed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainRestriction {
    /// Only follow links whose host matches the page they were found on
    #[serde(rename = "Stay in same domain")]
    SameDomain,
    /// Follow links to any host
    #[serde(rename = "Allow all domains")]
    AllowAll,
    /// Follow links whose host contains one of the custom domains
    #[serde(rename = "Custom domain list")]
    CustomList,
}

impl DomainRestriction {
    pub fn label(&self) -> &'static str {
        match self {
            DomainRestriction::SameDomain => "Stay in same domain",
            DomainRestriction::AllowAll => "Allow all domains",
            DomainRestriction::CustomList => "Custom domain list",
        }
    }
}

impl fmt::Display for DomainRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DomainRestriction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Stay in same domain" | "same-domain" => Ok(DomainRestriction::SameDomain),
            "Allow all domains" | "all" => Ok(DomainRestriction::AllowAll),
            "Custom domain list" | "custom" => Ok(DomainRestriction::CustomList),
            other => Err(format!(
                "unknown domain restriction '{}' (expected \"Stay in same domain\", \
                 \"Allow all domains\" or \"Custom domain list\")",
                other
            )),
        }
    }
}

// Everything needed to run one crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub start_url: String,
    /// How many link hops to follow from the start page (>= 1)
    pub depth_limit: usize,
    /// Upper bound on the number of distinct URLs fetched (>= 1)
    pub max_pages: usize,
    pub timeout_seconds: u64,
    pub domain_restriction: DomainRestriction,
    /// Only consulted for DomainRestriction::CustomList.
    /// A BTreeSet keeps the order stable, which matters for the cache key.
    pub custom_domains: BTreeSet<String>,
    pub user_agent: String,
    /// Maximum number of requests in flight at once
    pub max_concurrency: usize,
    pub respect_robots: bool,
    pub use_cache: bool,
}

impl CrawlRequest {
    // Creates a request for the given URL with every other field at its default
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            depth_limit: DEFAULT_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            domain_restriction: DomainRestriction::SameDomain,
            custom_domains: BTreeSet::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrency: DEFAULT_MAX_WORKERS,
            respect_robots: true,
            use_cache: true,
        }
    }

    // Checks every parameter and returns a normalized copy of the request
    //
    // Returns CrawlError::Validation listing *all* problems found, so the
    // user can fix them in one go. Non-fatal concerns are logged as warnings.
    pub fn validate(&self) -> Result<CrawlRequest, CrawlError> {
        let mut errors = Vec::new();

        let start_url = match validate_start_url(&self.start_url) {
            Ok(url) => url,
            Err(url_errors) => {
                errors.extend(url_errors.into_iter().map(|e| format!("URL: {}", e)));
                self.start_url.clone()
            }
        };

        if !in_range(self.depth_limit, DEPTH_RANGE) {
            errors.push("Depth must be an integer between 1 and 10".to_string());
        }
        if !in_range(self.max_pages, MAX_PAGES_RANGE) {
            errors.push("Max pages must be an integer between 1 and 1000".to_string());
        }
        if !in_range(self.timeout_seconds, TIMEOUT_RANGE) {
            errors.push("Timeout must be an integer between 5 and 300 seconds".to_string());
        }
        if !in_range(self.max_concurrency, WORKERS_RANGE) {
            errors.push("Max workers must be an integer between 1 and 50".to_string());
        }

        let custom_domains = match validate_domain_list(&self.custom_domains) {
            Ok(domains) => domains,
            Err(domain_errors) => {
                errors.extend(domain_errors);
                BTreeSet::new()
            }
        };

        if !errors.is_empty() {
            return Err(CrawlError::Validation(errors));
        }

        for warning in self.warnings() {
            tracing::warn!(%warning, "crawl parameter warning");
        }

        Ok(CrawlRequest {
            start_url,
            custom_domains,
            user_agent: self.user_agent.trim().to_string(),
            ..self.clone()
        })
    }

    // Things that are allowed but probably not what the user wants
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.user_agent.trim().len() < 10 {
            warnings.push("User agent should be a meaningful string".to_string());
        }
        if self.depth_limit > 3 && self.max_pages > 100 {
            warnings.push("High depth and page count may result in long crawl times".to_string());
        }
        if self.max_concurrency > 20 {
            warnings.push("High worker count may overwhelm target server".to_string());
        }
        warnings
    }
}

fn in_range<T: PartialOrd>(value: T, (min, max): (T, T)) -> bool {
    value >= min && value <= max
}

// Parses and normalizes the start URL
//
// The url crate already lower-cases the scheme and host; we also drop the
// fragment since it never changes what the server sends back.
fn validate_start_url(raw: &str) -> Result<String, Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(vec!["URL must be a non-empty string".to_string()]);
    }

    let mut errors = Vec::new();
    let lowered = raw.to_ascii_lowercase();
    for pattern in DANGEROUS_PATTERNS {
        if lowered.contains(pattern) {
            errors.push(format!("Dangerous URL pattern detected: {}", pattern));
        }
    }

    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            errors.push(format!("Invalid URL format: {}", e));
            return Err(errors);
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        errors.push(format!(
            "Invalid URL scheme: {}. Only http and https are allowed",
            url.scheme()
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        errors.push("URL must have a valid domain".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    url.set_fragment(None);
    Ok(url.to_string())
}

// Validates custom domain entries, returning them trimmed and lower-cased
//
// Entries may carry a port ("localhost:8080") since domain matching works
// on the network location.
fn validate_domain_list(domains: &BTreeSet<String>) -> Result<BTreeSet<String>, Vec<String>> {
    let mut errors = Vec::new();
    let mut valid = BTreeSet::new();

    for (i, entry) in domains.iter().enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if is_valid_domain(entry) {
            valid.insert(entry.to_ascii_lowercase());
        } else {
            errors.push(format!("Custom domain {}: Invalid domain format: {}", i + 1, entry));
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(errors)
    }
}

fn is_valid_domain(entry: &str) -> bool {
    let (host, port) = match entry.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (entry, None),
    };

    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return false;
        }
    }

    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

// Splits user input into domain entries
//
// Accepts both repeated flags and newline-separated lists (the original UI
// used a text area with one domain per line).
pub fn parse_domain_list<I, S>(inputs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .flat_map(|input| {
            input
                .as_ref()
                .lines()
                .map(|line| line.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
