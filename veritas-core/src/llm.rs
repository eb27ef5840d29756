//! External service contracts.
//!
//! Request/response types and async traits for the three upstreams the
//! pipeline protects: text generation, web answers and web search.
//! HTTP implementations live in veritas-llm; mocks in veritas-test-utils.

use crate::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for calls into an upstream service.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

// ============================================================================
// GENERATION SERVICE
// ============================================================================

/// Request for the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System instructions (may be empty).
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Candidate models, tried in order. The first non-empty response wins.
    pub models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Response from the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub model_used: String,
}

/// Text-generation service.
///
/// Implementations try `request.models` in order and return the first
/// non-empty completion; exhausting every candidate is
/// `UpstreamError::AllModelsFailed`.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> UpstreamResult<GenerationResponse>;
}

// ============================================================================
// WEB ANSWER SERVICE
// ============================================================================

/// Grounded answer from the web-answer service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAnswer {
    pub answer_text: String,
    /// Cited URLs, normalized (trimmed, deduplicated, order preserved).
    pub cited_urls: Vec<String>,
}

impl WebAnswer {
    /// Whether this answer provides any grounding at all.
    pub fn has_grounding(&self) -> bool {
        let text = self.answer_text.trim();
        if text.is_empty() {
            return false;
        }
        let lowered = text.to_ascii_lowercase();
        !NO_RESULT_MARKERS
            .iter()
            .any(|marker| lowered.starts_with(marker))
    }
}

/// Answer prefixes the web-answer service uses when it found nothing.
pub const NO_RESULT_MARKERS: &[&str] = &[
    "no results",
    "no relevant results",
    "i could not find",
    "i couldn't find",
    "i was unable to find",
    "there is no information",
];

/// Web-answer (search-grounded answering) service.
#[async_trait]
pub trait WebAnswerService: Send + Sync {
    async fn answer(&self, query: &str) -> UpstreamResult<WebAnswer>;
}

/// Normalize cited URLs: trim, drop empties and fragments, dedupe keeping
/// first occurrence.
pub fn normalize_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for url in urls {
        let trimmed = url.as_ref().trim();
        let without_fragment = trimmed.split('#').next().unwrap_or_default();
        let cleaned = without_fragment.trim_end_matches('/');
        if cleaned.is_empty() {
            continue;
        }
        if !out.iter().any(|existing| existing == cleaned) {
            out.push(cleaned.to_string());
        }
    }
    out
}

// ============================================================================
// WEB SEARCH SERVICE
// ============================================================================

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web-search service returning ordered results.
#[async_trait]
pub trait WebSearchService: Send + Sync {
    async fn search(&self, query: &str, result_count: usize) -> UpstreamResult<Vec<SearchResult>>;
}

// ============================================================================
// CIRCUIT STATE
// ============================================================================

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, a probe is testing whether the service recovered
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_answer_grounding() {
        assert!(!WebAnswer::default().has_grounding());
        assert!(!WebAnswer {
            answer_text: "No results found for that query.".to_string(),
            cited_urls: vec![],
        }
        .has_grounding());
        assert!(WebAnswer {
            answer_text: "The Earth is an oblate spheroid.".to_string(),
            cited_urls: vec![],
        }
        .has_grounding());
    }

    #[test]
    fn test_normalize_urls_dedupes_and_trims() {
        let urls = normalize_urls([
            " https://a.example/x/ ",
            "https://a.example/x#section",
            "",
            "https://b.example",
        ]);
        assert_eq!(urls, vec!["https://a.example/x", "https://b.example"]);
    }

    #[test]
    fn test_circuit_state_labels() {
        assert_eq!(CircuitState::HalfOpen.as_str(), "half_open");
    }
}
