// src/health.rs
// =============================================================================
// This module checks whether a single URL is reachable before crawling it.
//
// Key functionality:
// - Makes an HTTP HEAD request (lightweight, no body download)
// - Follows up to 5 redirects and reports where we ended up
// - Reports the status code, or why the request failed
//
// A URL counts as accessible only when the final response is 200 OK.
// =============================================================================

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

// The result of probing one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// The URL that was checked
    pub url: String,
    /// HTTP status of the final response, None if no response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub accessible: bool,
    /// Where redirects led; equal to `url` when there were none
    pub final_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Builds the client used for health checks
pub fn health_client(user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(HEALTH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

// Probes a single URL
pub async fn check_url_health(client: &Client, url: &str) -> HealthReport {
    match client.head(url).send().await {
        Ok(response) => {
            let status = response.status();
            HealthReport {
                url: url.to_string(),
                status_code: Some(status.as_u16()),
                accessible: status == StatusCode::OK,
                final_url: response.url().to_string(),
                error: None,
            }
        }
        Err(e) => HealthReport {
            url: url.to_string(),
            status_code: None,
            accessible: false,
            final_url: url.to_string(),
            error: Some(categorize_error(&e)),
        },
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: &reqwest::Error) -> String {
    let error_string = error.to_string();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "Could not resolve hostname".to_string()
        } else {
            "Connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}
