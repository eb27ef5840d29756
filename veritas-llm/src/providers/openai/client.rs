//! Shared JSON-over-HTTPS transport for OpenAI-compatible endpoints

use super::types::ApiError;
use crate::providers::{invalid_response, parse_retry_after_ms, rate_limited, request_failed, transport_error};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use veritas_core::{UpstreamError, UpstreamResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MIN_SPACING_MS: u64 = 10;

/// Spaces outgoing calls so a single client never exceeds its per-minute quota.
struct Pacer {
    in_flight: Semaphore,
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    fn per_minute(rpm: u32) -> Self {
        let rpm = rpm.max(1);
        Self {
            in_flight: Semaphore::new(rpm as usize),
            spacing: Duration::from_millis((60_000 / u64::from(rpm)).max(MIN_SPACING_MS)),
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for this caller's turn. The lock is held across the sleep so
    /// concurrent callers queue up one spacing apart.
    async fn wait_turn(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(slot) = *next_slot {
            tokio::time::sleep_until(slot).await;
        }
        *next_slot = Some(Instant::now() + self.spacing);
    }
}

/// Client for the chat-completions family of APIs.
///
/// One instance backs each upstream (generation, web answer); `service`
/// names that upstream in every `UpstreamError` the client returns.
pub struct OpenAIClient {
    http: Client,
    service: &'static str,
    api_key: SecretString,
    base_url: String,
    pacer: Pacer,
}

impl OpenAIClient {
    pub fn new(service: &'static str, api_key: SecretString, requests_per_minute: u32) -> Self {
        Self {
            http: Client::new(),
            service,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            pacer: Pacer::per_minute(requests_per_minute),
        }
    }

    /// Target a different OpenAI-compatible host (OpenRouter, Perplexity, ...).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every call; an elapsed timeout maps to `UpstreamError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match Client::builder().timeout(timeout).build() {
            Ok(http) => self.http = http,
            Err(e) => tracing::warn!(service = self.service, error = %e, "Keeping default HTTP client"),
        }
        self
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `{base_url}/{endpoint}` and decode the JSON reply.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Req,
    ) -> UpstreamResult<Res> {
        let _permit = self
            .pacer
            .in_flight
            .acquire()
            .await
            .map_err(|_| request_failed(self.service, 0, "client is shutting down"))?;
        self.pacer.wait_turn().await;

        let response = self
            .http
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.service, e))?;

        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }
        response
            .json::<Res>()
            .await
            .map_err(|e| invalid_response(self.service, format!("undecodable body: {}", e)))
    }

    async fn reject(&self, response: Response) -> UpstreamError {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);
            return rate_limited(self.service, wait_ms);
        }
        let raw = response.text().await.unwrap_or_default();
        request_failed(self.service, status.as_u16(), error_message(raw))
    }
}

/// Prefer the structured `error.message`; fall back to the raw body.
fn error_message(raw: String) -> String {
    match serde_json::from_str::<ApiError>(&raw) {
        Ok(parsed) => parsed.error.message,
        Err(_) if raw.trim().is_empty() => "empty error body".to_string(),
        Err(_) => raw,
    }
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("spacing", &self.pacer.spacing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAIClient::new("generation", SecretString::from("key".to_string()), 60)
            .with_base_url("https://openrouter.ai/api/v1/");
        assert_eq!(client.base_url(), "https://openrouter.ai/api/v1");
        assert_eq!(client.service(), "generation");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let key = SecretString::from("pplx-secret".to_string());
        let client = OpenAIClient::new("web_answer", key, 10);
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("pplx-secret"));
        assert!(rendered.contains("web_answer"));
    }

    #[test]
    fn test_spacing_follows_quota() {
        assert_eq!(Pacer::per_minute(60).spacing, Duration::from_secs(1));
        assert_eq!(Pacer::per_minute(0).spacing, Duration::from_secs(60));
        assert_eq!(Pacer::per_minute(100_000).spacing, Duration::from_millis(MIN_SPACING_MS));
    }

    #[test]
    fn test_error_message_prefers_structured_body() {
        let body = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#.to_string();
        assert_eq!(error_message(body), "model overloaded");
        assert_eq!(error_message("bad gateway".to_string()), "bad gateway");
        assert_eq!(error_message("  ".to_string()), "empty error body");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_consecutive_turns() {
        let pacer = Pacer::per_minute(60);
        let start = Instant::now();
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
