//! Perplexity web-answer provider
//!
//! Perplexity exposes an OpenAI-compatible chat endpoint whose responses
//! carry the URLs the answer was grounded on.

use crate::providers::openai::types::{CompletionRequest, CompletionResponse, Message};
use crate::providers::OpenAIClient;
use async_trait::async_trait;
use tracing::debug;
use veritas_core::{normalize_urls, UpstreamResult, WebAnswer, WebAnswerService};

const SYSTEM_PROMPT: &str = "You are a fact-finding assistant. Answer the query using current, \
reputable web sources. Be concise and factual. If nothing relevant can be found, reply exactly: \
No results.";

/// Web-answer provider backed by Perplexity's chat completions API.
pub struct PerplexityAnswerProvider {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
}

impl PerplexityAnswerProvider {
    /// # Arguments
    /// * `client` - Client pointed at the Perplexity base URL
    /// * `model` - Model name (e.g. "sonar", "sonar-pro")
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 500,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Turn a raw completion into a `WebAnswer`. A response without choices is
/// an empty answer, which callers treat as "no grounding".
fn to_web_answer(response: CompletionResponse) -> WebAnswer {
    let answer_text = response
        .first_content()
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    let urls = response
        .citations
        .iter()
        .map(String::as_str)
        .chain(response.search_results.iter().map(|r| r.url.as_str()));

    WebAnswer {
        answer_text,
        cited_urls: normalize_urls(urls),
    }
}

#[async_trait]
impl WebAnswerService for PerplexityAnswerProvider {
    async fn answer(&self, query: &str) -> UpstreamResult<WebAnswer> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(query)],
            max_tokens: Some(self.max_tokens),
            temperature: Some(0.0),
        };

        let response: CompletionResponse = self.client.request("chat/completions", request).await?;
        let answer = to_web_answer(response);
        debug!(
            model = %self.model,
            citations = answer.cited_urls.len(),
            grounded = answer.has_grounding(),
            "web answer received"
        );
        Ok(answer)
    }
}

impl std::fmt::Debug for PerplexityAnswerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityAnswerProvider")
            .field("model", &self.model)
            .field("client", &self.client)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CompletionResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_citations_and_search_results_are_merged() {
        let response = parse(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": " Vaccines are effective. "}}],
                "citations": ["https://who.int/vaccines/", "https://cdc.gov/x"],
                "search_results": [{"title": "WHO", "url": "https://who.int/vaccines"}]
            }"#,
        );
        let answer = to_web_answer(response);
        assert_eq!(answer.answer_text, "Vaccines are effective.");
        assert_eq!(
            answer.cited_urls,
            vec!["https://who.int/vaccines", "https://cdc.gov/x"]
        );
        assert!(answer.has_grounding());
    }

    #[test]
    fn test_missing_choices_is_ungrounded() {
        let answer = to_web_answer(parse(r#"{"choices": []}"#));
        assert!(answer.answer_text.is_empty());
        assert!(!answer.has_grounding());
    }

    #[test]
    fn test_no_results_reply_is_ungrounded() {
        let answer = to_web_answer(parse(
            r#"{"choices": [{"message": {"role": "assistant", "content": "No results."}}]}"#,
        ));
        assert!(!answer.has_grounding());
    }
}
