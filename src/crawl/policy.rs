// src/crawl/policy.rs
// =============================================================================
// Domain restriction: which discovered links are allowed into the frontier.
//
// Hosts are compared by network location, i.e. the host plus an explicit
// port if the URL has one ("example.com", "127.0.0.1:8080").
//
// - SameDomain: the link's host must equal the host of the page the link was
//   found on. Note this is the *referring page*, not the start URL.
// - AllowAll: anything goes.
// - CustomList: the link's host must contain one of the custom domains
//   (substring match, so "example.com" also admits "docs.example.com").
// =============================================================================

use std::collections::BTreeSet;
use url::Url;

use super::request::DomainRestriction;

// Returns "host" or "host:port" for a URL, None if it has no host
pub fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

// Decides whether `candidate` (found on `referrer`) may be crawled
pub fn domain_allowed(
    candidate: &Url,
    referrer: &Url,
    restriction: DomainRestriction,
    custom_domains: &BTreeSet<String>,
) -> bool {
    let Some(target) = netloc(candidate) else {
        return false;
    };

    match restriction {
        DomainRestriction::SameDomain => netloc(referrer).as_deref() == Some(target.as_str()),
        DomainRestriction::AllowAll => true,
        DomainRestriction::CustomList => custom_domains
            .iter()
            .any(|domain| target.contains(domain.as_str())),
    }
}
