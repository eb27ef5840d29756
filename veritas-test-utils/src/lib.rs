//! VERITAS Test Utilities
//!
//! Shared test infrastructure for the VERITAS workspace:
//! - Mock upstream services (scripted, failing, static)
//! - A builder for message records with deterministic timestamps
//! - Proptest generators for messages and chat text

pub use veritas_core::{
    GenerationRequest, GenerationResponse, GenerationService, MessageRecord, SearchResult,
    Snowflake, Timestamp, UpstreamError, UpstreamResult, WebAnswer, WebAnswerService,
    WebSearchService,
};

use async_trait::async_trait;
use chrono::{TimeDelta, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// MOCK PROVIDERS
// ============================================================================

/// Generation service that replays queued responses in order.
///
/// Once the script is exhausted every call fails with `AllModelsFailed`.
#[derive(Debug, Default)]
pub struct ScriptedGeneration {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGeneration {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok()?.last().cloned()
    }

    /// Every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    async fn generate(&self, request: &GenerationRequest) -> UpstreamResult<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| UpstreamError::InvalidResponse {
                service: "generation".to_string(),
                reason: "script lock poisoned".to_string(),
            })?
            .pop_front();

        match next {
            Some(text) => Ok(GenerationResponse {
                text,
                model_used: request
                    .models
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "scripted".to_string()),
            }),
            None => Err(UpstreamError::AllModelsFailed {
                models: request.models.clone(),
            }),
        }
    }
}

/// Generation service that always fails with a server error.
#[derive(Debug, Default)]
pub struct FailingGeneration {
    calls: AtomicUsize,
}

impl FailingGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for FailingGeneration {
    async fn generate(&self, _request: &GenerationRequest) -> UpstreamResult<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::RequestFailed {
            service: "generation".to_string(),
            status: 500,
            message: "internal error".to_string(),
        })
    }
}

/// Web-answer service returning the same answer for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticWebAnswer {
    answer: WebAnswer,
}

impl StaticWebAnswer {
    pub fn grounded(text: &str, urls: &[&str]) -> Self {
        Self {
            answer: WebAnswer {
                answer_text: text.to_string(),
                cited_urls: urls.iter().map(|u| u.to_string()).collect(),
            },
        }
    }

    /// An answer with no grounding at all.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebAnswerService for StaticWebAnswer {
    async fn answer(&self, _query: &str) -> UpstreamResult<WebAnswer> {
        Ok(self.answer.clone())
    }
}

/// Web-answer service that always times out.
#[derive(Debug, Default)]
pub struct FailingWebAnswer {
    calls: AtomicUsize,
}

impl FailingWebAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebAnswerService for FailingWebAnswer {
    async fn answer(&self, _query: &str) -> UpstreamResult<WebAnswer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::Timeout {
            service: "web_answer".to_string(),
        })
    }
}

/// Web-search service with fixed results.
#[derive(Debug, Clone, Default)]
pub struct StaticWebSearch {
    results: Vec<SearchResult>,
}

impl StaticWebSearch {
    /// `results` are `(title, url, snippet)` triples.
    pub fn new(results: &[(&str, &str, &str)]) -> Self {
        Self {
            results: results
                .iter()
                .map(|(title, url, snippet)| SearchResult {
                    title: title.to_string(),
                    url: url.to_string(),
                    snippet: snippet.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl WebSearchService for StaticWebSearch {
    async fn search(&self, _query: &str, result_count: usize) -> UpstreamResult<Vec<SearchResult>> {
        Ok(self.results.iter().take(result_count).cloned().collect())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Timestamp of message id 0. Message `n` is created `n` seconds later.
pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Builder for `MessageRecord`s.
///
/// Defaults: author 100, channel 200, scope 300, human author, empty
/// content, `created_at = base_time() + id seconds`.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    record: MessageRecord,
}

impl MessageBuilder {
    pub fn new(id: Snowflake) -> Self {
        Self {
            record: MessageRecord {
                id,
                author_id: 100,
                channel_id: 200,
                scope_id: 300,
                content: String::new(),
                created_at: base_time() + TimeDelta::seconds(id as i64),
                is_bot: false,
            },
        }
    }

    pub fn author(mut self, author_id: Snowflake) -> Self {
        self.record.author_id = author_id;
        self
    }

    pub fn channel(mut self, channel_id: Snowflake) -> Self {
        self.record.channel_id = channel_id;
        self
    }

    pub fn scope(mut self, scope_id: Snowflake) -> Self {
        self.record.scope_id = scope_id;
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.record.content = content.into();
        self
    }

    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.record.created_at = created_at;
        self
    }

    pub fn bot(mut self) -> Self {
        self.record.is_bot = true;
        self
    }

    pub fn build(self) -> MessageRecord {
        self.record
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Free-form chat text, including punctuation and emoji-free symbols.
    pub fn arb_chat_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ,.!?'%-]{0,160}"
    }

    /// Short sentence-like text built from common words.
    pub fn arb_sentence() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![
                "the", "earth", "is", "flat", "round", "vaccines", "are", "safe", "not",
                "always", "never", "maybe", "today", "study", "shows", "people", "think",
            ]),
            1..12,
        )
        .prop_map(|words| words.join(" "))
    }

    pub fn arb_message_record() -> impl Strategy<Value = MessageRecord> {
        (
            1u64..1_000_000,
            1u64..50,
            1u64..10,
            arb_chat_text(),
            any::<bool>(),
        )
            .prop_map(|(id, author_id, scope_id, content, is_bot)| {
                let mut builder = MessageBuilder::new(id)
                    .author(author_id)
                    .scope(scope_id)
                    .content(content);
                if is_bot {
                    builder = builder.bot();
                }
                builder.build()
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: String::new(),
            prompt: "p".to_string(),
            models: vec!["m1".to_string()],
            temperature: 0.0,
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn test_scripted_generation_replays_then_fails() {
        let generation = ScriptedGeneration::new(["one"]);
        assert_eq!(generation.generate(&request()).await.unwrap().text, "one");
        assert!(matches!(
            generation.generate(&request()).await,
            Err(UpstreamError::AllModelsFailed { .. })
        ));
        assert_eq!(generation.calls(), 2);
        assert_eq!(generation.last_prompt().as_deref(), Some("p"));
    }

    #[test]
    fn test_builder_timestamps_follow_ids() {
        let a = MessageBuilder::new(1).build();
        let b = MessageBuilder::new(2).build();
        assert!(a.created_at < b.created_at);
        assert_eq!(b.created_at - a.created_at, TimeDelta::seconds(1));
    }

    #[tokio::test]
    async fn test_static_search_truncates() {
        let search = StaticWebSearch::new(&[("a", "https://a", "x"), ("b", "https://b", "y")]);
        assert_eq!(search.search("q", 1).await.unwrap().len(), 1);
    }
}
