// src/crawl/robots.rs
// =============================================================================
// robots.txt compliance.
//
// RobotsCache remembers one parsed robots.txt per origin (scheme://host).
// It is cheap to clone (the map lives behind an Arc), so a single cache can
// be handed to one crawl or shared between several.
//
// The policy is deliberately permissive when robots.txt is unavailable:
// - robots.txt returns a non-2xx status -> everything allowed (cached)
// - robots.txt can't be parsed           -> everything allowed (cached)
// - the request itself fails             -> allowed, nothing cached, so the
//                                           next URL on that origin retries
//
// Two fetches in the same wave may both miss the cache for a new origin and
// both download robots.txt. That's harmless: the result is the same and the
// first one stored wins.
// =============================================================================

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use texting_robots::Robot;
use tokio::sync::RwLock;
use url::Url;

use super::policy::netloc;

// What we learned from one origin's robots.txt
enum RobotsPolicy {
    AllowAll,
    Rules(Robot),
}

impl RobotsPolicy {
    fn allows(&self, url: &Url) -> bool {
        match self {
            RobotsPolicy::AllowAll => true,
            RobotsPolicy::Rules(robot) => robot.allowed(url.as_str()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RobotsCache {
    policies: Arc<RwLock<HashMap<String, Arc<RobotsPolicy>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Checks whether `user_agent` may fetch `url`
    //
    // Fetches and parses <origin>/robots.txt the first time an origin is seen.
    pub async fn is_allowed(&self, client: &Client, url: &Url, user_agent: &str) -> bool {
        let Some(origin) = origin_of(url) else {
            return true;
        };

        if let Some(policy) = self.policies.read().await.get(&origin) {
            return policy.allows(url);
        }

        let Some(policy) = fetch_policy(client, &origin, user_agent).await else {
            return true;
        };

        let policy = self
            .policies
            .write()
            .await
            .entry(origin)
            .or_insert_with(|| Arc::new(policy))
            .clone();

        policy.allows(url)
    }

    // Number of origins with a cached policy
    pub async fn cached_origins(&self) -> usize {
        self.policies.read().await.len()
    }
}

fn origin_of(url: &Url) -> Option<String> {
    Some(format!("{}://{}", url.scheme(), netloc(url)?))
}

// Downloads and parses robots.txt for an origin
//
// Returns None only when the request fails outright (connection refused,
// DNS failure, timeout).
async fn fetch_policy(client: &Client, origin: &str, user_agent: &str) -> Option<RobotsPolicy> {
    let robots_url = format!("{}/robots.txt", origin);

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(%robots_url, error = %e, "robots.txt unreachable, assuming allowed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!(%robots_url, status = %response.status(), "no robots.txt, allowing all");
        return Some(RobotsPolicy::AllowAll);
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(%robots_url, error = %e, "failed to read robots.txt body");
            return None;
        }
    };

    match Robot::new(user_agent, &body) {
        Ok(robot) => Some(RobotsPolicy::Rules(robot)),
        Err(e) => {
            tracing::warn!(%robots_url, error = %e, "unparseable robots.txt, allowing all");
            Some(RobotsPolicy::AllowAll)
        }
    }
}
