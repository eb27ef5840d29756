//! Brave web-search provider

use crate::providers::{invalid_response, parse_retry_after_ms, rate_limited, request_failed, transport_error};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use veritas_core::{SearchResult, UpstreamResult, WebSearchService};

const SERVICE: &str = "web_search";

/// Brave caps `count` at 20 per request.
const MAX_RESULT_COUNT: usize = 20;

/// Web search over the Brave Search REST API.
#[derive(Debug)]
pub struct BraveSearchProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl BraveSearchProvider {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.search.brave.com/res/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match Client::builder().timeout(timeout).build() {
            Ok(client) => self.client = client,
            Err(e) => tracing::warn!(service = SERVICE, error = %e, "Keeping default HTTP client"),
        }
        self
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

/// Drop inline markup (Brave highlights matches with `<strong>`).
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn to_results(response: SearchResponse, limit: usize) -> Vec<SearchResult> {
    response
        .web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .take(limit)
        .map(|r| SearchResult {
            title: strip_tags(&r.title),
            url: r.url.trim().to_string(),
            snippet: strip_tags(&r.description),
        })
        .collect()
}

#[async_trait]
impl WebSearchService for BraveSearchProvider {
    async fn search(&self, query: &str, result_count: usize) -> UpstreamResult<Vec<SearchResult>> {
        let count = result_count.clamp(1, MAX_RESULT_COUNT);
        let count_param = count.to_string();
        let url = format!("{}/web/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", self.api_key.expose_secret())
            .query(&[("q", query), ("count", count_param.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
            return Err(rate_limited(SERVICE, retry_after_ms));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(request_failed(SERVICE, status.as_u16(), message));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(SERVICE, format!("Failed to parse response: {}", e)))?;

        let results = to_results(parsed, count);
        debug!(results = results.len(), "web search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_subscription_token() {
        let provider = BraveSearchProvider::new(SecretString::from("brave-token".to_string()))
            .with_base_url("https://search.internal/v1/");
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("brave-token"));
        assert!(rendered.contains("https://search.internal/v1"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("The <strong>earth</strong> is round"), "The earth is round");
        assert_eq!(strip_tags("plain"), "plain");
    }

    #[test]
    fn test_to_results_limits_and_cleans() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"web": {"results": [
                {"title": "A", "url": "https://a.example", "description": "<strong>alpha</strong>"},
                {"title": "Empty", "url": "  "},
                {"title": "B", "url": "https://b.example", "description": "beta"},
                {"title": "C", "url": "https://c.example", "description": "gamma"}
            ]}}"#,
        )
        .unwrap();
        let results = to_results(response, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "alpha");
        assert_eq!(results[1].url, "https://b.example");
    }

    #[test]
    fn test_to_results_without_web_section() {
        let response: SearchResponse = serde_json::from_str(r#"{"type": "search"}"#).unwrap();
        assert!(to_results(response, 3).is_empty());
    }
}
