//! Upstream provider implementations
//!
//! Concrete implementations of the veritas-core service traits:
//! OpenAI-compatible chat completions for generation, Perplexity for
//! citation-grounded web answers, and Brave for web search.

pub mod brave;
pub mod openai;
pub mod perplexity;

pub use brave::BraveSearchProvider;
pub use openai::{OpenAIClient, OpenAIGenerationProvider};
pub use perplexity::PerplexityAnswerProvider;

use veritas_core::UpstreamError;

pub(crate) fn request_failed(service: &str, status: u16, message: impl Into<String>) -> UpstreamError {
    UpstreamError::RequestFailed {
        service: service.to_string(),
        status,
        message: message.into(),
    }
}

pub(crate) fn rate_limited(service: &str, retry_after_ms: u64) -> UpstreamError {
    UpstreamError::RateLimited {
        service: service.to_string(),
        retry_after_ms,
    }
}

pub(crate) fn invalid_response(service: &str, reason: impl Into<String>) -> UpstreamError {
    UpstreamError::InvalidResponse {
        service: service.to_string(),
        reason: reason.into(),
    }
}

/// Map a transport-level reqwest failure onto the upstream taxonomy.
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            service: service.to_string(),
        }
    } else {
        request_failed(service, 0, format!("HTTP request failed: {}", err))
    }
}

pub(crate) fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}
