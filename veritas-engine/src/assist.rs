//! Assistant tasks: scope summaries and interactive replies.
//!
//! Both go through the same guarded services as detection, in their own
//! priority classes.

use crate::constants::{ASSIST_MAX_TOKENS, MAX_SUMMARY_MESSAGES};
use crate::context::PipelineContext;
use crate::detect::prompts;
use std::sync::Arc;
use tracing::{debug, warn};
use veritas_core::{
    GenerationRequest, MessageRecord, PriorityClass, Snowflake, VeritasResult,
};
use veritas_storage::MessageFilter;

/// Summaries and replies over a shared pipeline context.
#[derive(Debug, Clone)]
pub struct Assistant {
    ctx: Arc<PipelineContext>,
}

impl Assistant {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    fn request(&self, system: &str, prompt: String) -> GenerationRequest {
        let detection = &self.ctx.config().detection;
        GenerationRequest {
            system: system.to_string(),
            prompt,
            models: detection.models.clone(),
            temperature: detection.temperature,
            max_tokens: ASSIST_MAX_TOKENS,
        }
    }

    /// Summarize recent human messages in a scope, optionally one channel.
    ///
    /// Returns `None` when there is nothing to summarize.
    pub async fn summarize_scope(
        &self,
        scope_id: Snowflake,
        channel_id: Option<Snowflake>,
        limit: usize,
    ) -> VeritasResult<Option<String>> {
        let limit = limit.clamp(1, MAX_SUMMARY_MESSAGES);
        let mut filter = MessageFilter::scope(scope_id).without_bots();
        if let Some(channel) = channel_id {
            filter = filter.in_channel(channel);
        }

        let mut messages: Vec<MessageRecord> = self
            .ctx
            .store()
            .find_recent(&filter, limit)
            .await?
            .into_iter()
            .filter(|m| !m.content.trim().is_empty())
            .collect();
        if messages.is_empty() {
            debug!(scope_id, "Nothing to summarize");
            return Ok(None);
        }
        messages.reverse();

        let request = self.request(prompts::SUMMARY_SYSTEM, prompts::summary_prompt(&messages));
        let response = self
            .ctx
            .services()
            .generate(&request, PriorityClass::Summarization)
            .await?;
        Ok(non_empty(response.text))
    }

    /// Answer a question asked in `message`.
    ///
    /// Web grounding is used when the answer service has something; a
    /// failed or empty answer falls back to the model alone.
    pub async fn reply(&self, message: &MessageRecord, question: &str) -> VeritasResult<Option<String>> {
        let services = self.ctx.services();
        let grounding = match services
            .answer(question, PriorityClass::InteractiveReply)
            .await
        {
            Ok(answer) if answer.has_grounding() => Some(answer),
            Ok(_) => None,
            Err(e) => {
                warn!(message_id = message.id, error = %e, "Web answer failed, replying ungrounded");
                None
            }
        };

        let request = self.request(
            prompts::REPLY_SYSTEM,
            prompts::reply_prompt(question, grounding.as_ref()),
        );
        let response = services
            .generate(&request, PriorityClass::InteractiveReply)
            .await?;
        Ok(non_empty(response.text))
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Upstreams;
    use veritas_core::PipelineConfig;
    use veritas_storage::InMemoryMessageStore;
    use veritas_test_utils::{MessageBuilder, ScriptedGeneration, StaticWebAnswer};

    fn assistant(generation: Arc<ScriptedGeneration>, answer: StaticWebAnswer) -> Assistant {
        let ctx = PipelineContext::new(
            PipelineConfig::default(),
            Arc::new(InMemoryMessageStore::new()),
            Upstreams {
                generation,
                web_answer: Arc::new(answer),
                web_search: None,
            },
        );
        Assistant::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_summary_of_empty_scope_is_none() {
        let generation = Arc::new(ScriptedGeneration::new(["unused"]));
        let assistant = assistant(generation.clone(), StaticWebAnswer::empty());
        assert_eq!(assistant.summarize_scope(1, None, 50).await.unwrap(), None);
        assert_eq!(generation.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_skips_bots_and_orders_oldest_first() {
        let generation = Arc::new(ScriptedGeneration::new(["People discussed the moon."]));
        let assistant = assistant(generation.clone(), StaticWebAnswer::empty());
        let ctx = &assistant.ctx;
        ctx.ingest(&MessageBuilder::new(1).scope(1).content("first").build())
            .await
            .unwrap();
        ctx.ingest(&MessageBuilder::new(2).scope(1).bot().content("beep").build())
            .await
            .unwrap();
        ctx.ingest(&MessageBuilder::new(3).scope(1).content("second").build())
            .await
            .unwrap();

        let summary = assistant.summarize_scope(1, None, 50).await.unwrap();
        assert_eq!(summary.as_deref(), Some("People discussed the moon."));

        let prompt = generation.last_prompt().unwrap();
        assert!(!prompt.contains("beep"));
        assert!(prompt.find("first").unwrap() < prompt.find("second").unwrap());
    }

    #[tokio::test]
    async fn test_reply_uses_grounding_when_available() {
        let generation = Arc::new(ScriptedGeneration::new(["It is about 384,400 km away."]));
        let assistant = assistant(
            generation.clone(),
            StaticWebAnswer::grounded("The moon is 384,400 km away.", &["https://nasa.gov"]),
        );
        let message = MessageBuilder::new(1).content("how far is the moon?").build();
        let reply = assistant.reply(&message, "how far is the moon?").await.unwrap();
        assert!(reply.is_some());
        assert!(generation.last_prompt().unwrap().contains("Web context"));
    }

    #[tokio::test]
    async fn test_reply_without_grounding() {
        let generation = Arc::new(ScriptedGeneration::new(["Hello!"]));
        let assistant = assistant(generation.clone(), StaticWebAnswer::empty());
        let message = MessageBuilder::new(1).content("hi bot").build();
        assert_eq!(
            assistant.reply(&message, "hi bot").await.unwrap().as_deref(),
            Some("Hello!")
        );
        assert_eq!(generation.last_prompt().unwrap(), "Question: hi bot");
    }
}
