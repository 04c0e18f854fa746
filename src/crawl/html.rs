// src/crawl/html.rs
// =============================================================================
// This module pulls things out of fetched HTML pages.
//
// - extract_links: finds the <a href> targets worth following
// - html_to_text: turns a page into plain readable text
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Link extraction only decides what *looks like* a crawlable URL. Whether a
// link is actually allowed (domain restriction, robots.txt, already visited)
// is decided elsewhere, in policy.rs and the frontier.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

// Extracts candidate links from an HTML page
//
// Parameters:
//   html: the HTML content to parse
//   page_url: the URL the page was fetched from
//
// Returns: absolute http/https URLs, in document order, fragments removed
//
// Example:
//   html = "<a href='/docs'>Docs</a><a href='mailto:x@y.z'>Mail</a>"
//   page_url = "https://example.com/blog/post"
//   result = ["https://example.com/docs"]
pub fn extract_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    // Selector::parse only fails on invalid CSS; this one is a constant
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(page_url, href))
        .collect()
}

// Resolves one href into an absolute, crawlable URL
//
// Relative links are joined against the page's *origin* (scheme://host),
// not the full page path, so "docs" on /blog/post becomes /docs.
//
// Returns None for:
// - fragment-only links (#section)
// - javascript:, mailto: and tel: links
// - anything that doesn't end up as http/https with a host
pub fn resolve_link(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let mut url = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()?
    } else {
        let origin = Url::parse(&page_url.origin().ascii_serialization()).ok()?;
        origin.join(href).ok()?
    };

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

// Converts HTML into plain text
//
// Script and style contents are dropped and all runs of whitespace are
// collapsed to a single space.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| matches!(el.name(), "script" | "style"))
        });

        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}
