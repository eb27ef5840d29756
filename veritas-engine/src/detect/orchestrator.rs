//! Detection orchestrator: the two detection tracks.
//!
//! Track A (contradiction) compares a message with the author's own prior
//! statements; Track B (misinformation) compares it with web evidence.
//! `run_*` return a `TrackOutcome` and propagate upstream and storage
//! errors; `check_*` absorb every failure into "no detection".

use super::evidence::locate_evidence;
use super::prefilter::{self, FilterOutcome};
use super::prompts;
use crate::context::PipelineContext;
use crate::telemetry::metrics;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use veritas_core::{
    normalize_text, DetectionKind, DetectionResult, GenerationRequest, JobKind, MessageRecord,
    PriorityClass, SkipReason, TrackOutcome, Verdict, VeritasResult,
};
use veritas_llm::{deserialize_loose_verdict, parse_verdict, ParsedVerdict};

/// Structured verdict requested from the model for Track A.
#[derive(Debug, Clone, Deserialize)]
pub struct ContradictionVerdict {
    #[serde(deserialize_with = "deserialize_loose_verdict")]
    pub contradiction: Verdict,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub evidence: String,
}

/// Structured verdict requested from the model for Track B.
#[derive(Debug, Clone, Deserialize)]
pub struct MisinformationVerdict {
    #[serde(deserialize_with = "deserialize_loose_verdict")]
    pub misinformation: Verdict,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub url: String,
}

/// Runs the detection tracks against a shared pipeline context.
#[derive(Debug, Clone)]
pub struct DetectionOrchestrator {
    ctx: Arc<PipelineContext>,
}

impl DetectionOrchestrator {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    fn prefilter_skip(&self, message: &MessageRecord) -> Option<SkipReason> {
        match prefilter::classify(&message.content) {
            FilterOutcome::Pass => None,
            FilterOutcome::Trivial(_) => Some(SkipReason::Trivial),
            FilterOutcome::ForeignCommand => Some(SkipReason::ForeignCommand),
        }
    }

    fn generation_request(&self, system: &str, prompt: String) -> GenerationRequest {
        let detection = &self.ctx.config().detection;
        GenerationRequest {
            system: system.to_string(),
            prompt,
            models: detection.models.clone(),
            temperature: detection.temperature,
            max_tokens: detection.max_tokens,
        }
    }

    // ========================================================================
    // TRACK A: CONTRADICTION
    // ========================================================================

    /// Substantive prior statements by the author in scope, newest first.
    async fn prior_statements(&self, message: &MessageRecord) -> VeritasResult<Vec<MessageRecord>> {
        let config = self.ctx.config();
        let threshold = config.detection.substantive_threshold;
        let history = self
            .ctx
            .history()
            .author_history(
                self.ctx.store(),
                message.author_id,
                message.scope_id,
                config.cache.author_history_len,
            )
            .await?;

        Ok(history
            .into_iter()
            .filter(|m| m.id != message.id && !m.is_bot)
            .filter(|m| matches!(prefilter::classify(&m.content), FilterOutcome::Pass))
            .filter(|m| self.ctx.analyze(&m.content).is_substantive(threshold))
            .collect())
    }

    pub async fn run_contradiction(
        &self,
        message: &MessageRecord,
        class: PriorityClass,
    ) -> VeritasResult<TrackOutcome> {
        let kind = DetectionKind::Contradiction;
        if let Some(reason) = self.prefilter_skip(message) {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(reason)));
        }

        let prior = self.prior_statements(message).await?;
        let Some(latest) = prior.first() else {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::NoHistory)));
        };
        if normalize_text(&latest.content) == normalize_text(&message.content) {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::Duplicate)));
        }

        let threshold = self.ctx.config().detection.substantive_threshold;
        if !self.ctx.analyze(&message.content).is_substantive(threshold) {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::LowSubstance)));
        }

        let mut window: Vec<MessageRecord> = prior
            .into_iter()
            .take(self.ctx.config().detection.history_window)
            .collect();
        window.reverse();

        let request = self.generation_request(
            prompts::CONTRADICTION_SYSTEM,
            prompts::contradiction_prompt(&window, &message.content),
        );
        let response = self.ctx.services().generate(&request, class).await?;

        let verdict = match parse_verdict::<ContradictionVerdict>(&response.text) {
            ParsedVerdict::Parsed(verdict) => verdict,
            ParsedVerdict::Unparseable { reason } => {
                warn!(
                    message_id = message.id,
                    model = %response.model_used,
                    reason = %reason,
                    "Unparseable contradiction verdict"
                );
                return Ok(self.finish(
                    kind,
                    message,
                    TrackOutcome::Skipped(SkipReason::MalformedResponse),
                ));
            }
        };
        if !verdict.contradiction.is_yes() {
            return Ok(self.finish(kind, message, TrackOutcome::Clear));
        }

        let Some(evidence) = locate_evidence(&verdict.evidence, &window) else {
            debug!(
                message_id = message.id,
                quote = %verdict.evidence,
                "Quoted evidence not found in history"
            );
            return Ok(self.finish(
                kind,
                message,
                TrackOutcome::Skipped(SkipReason::UnverifiableEvidence),
            ));
        };

        if !self.ctx.validate(&evidence.content, &message.content) {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::Invalidated)));
        }

        let result = DetectionResult {
            kind,
            verdict: Verdict::Yes,
            reason: verdict.reason.trim().to_string(),
            evidence_quote: evidence.content.clone(),
            evidence_url: Some(evidence.deep_link()),
        };
        Ok(self.finish(kind, message, TrackOutcome::Detected(result)))
    }

    // ========================================================================
    // TRACK B: MISINFORMATION
    // ========================================================================

    pub async fn run_misinformation(
        &self,
        message: &MessageRecord,
        class: PriorityClass,
    ) -> VeritasResult<TrackOutcome> {
        let kind = DetectionKind::Misinformation;
        if let Some(reason) = self.prefilter_skip(message) {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(reason)));
        }

        let detection = &self.ctx.config().detection;
        if message.content.chars().count() > detection.misinformation_max_chars {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::TooLong)));
        }

        let query = prompts::fact_check_query(&message.content);
        let services = self.ctx.services();
        let answer = services.answer(&query, class).await?;
        if !answer.has_grounding() {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::NoGrounding)));
        }

        let results = if answer.cited_urls.is_empty() && services.has_search() {
            match services
                .search(&query, detection.search_result_count, class)
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    warn!(message_id = message.id, error = %e, "Web search failed, using answer alone");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if !self
            .ctx
            .analyze(&message.content)
            .is_substantive(detection.substantive_threshold)
        {
            return Ok(self.finish(kind, message, TrackOutcome::Skipped(SkipReason::LowSubstance)));
        }

        let request = self.generation_request(
            prompts::MISINFORMATION_SYSTEM,
            prompts::misinformation_prompt(&message.content, &answer, &results),
        );
        let response = services.generate(&request, class).await?;

        let verdict = match parse_verdict::<MisinformationVerdict>(&response.text) {
            ParsedVerdict::Parsed(verdict) => verdict,
            ParsedVerdict::Unparseable { reason } => {
                warn!(
                    message_id = message.id,
                    model = %response.model_used,
                    reason = %reason,
                    "Unparseable misinformation verdict"
                );
                return Ok(self.finish(
                    kind,
                    message,
                    TrackOutcome::Skipped(SkipReason::MalformedResponse),
                ));
            }
        };
        if !verdict.misinformation.is_yes() {
            return Ok(self.finish(kind, message, TrackOutcome::Clear));
        }
        if verdict.reason.trim().is_empty() {
            warn!(message_id = message.id, "Positive misinformation verdict without a reason");
            return Ok(self.finish(
                kind,
                message,
                TrackOutcome::Skipped(SkipReason::MalformedResponse),
            ));
        }

        let url = Some(verdict.url.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .or_else(|| answer.cited_urls.first().cloned())
            .or_else(|| results.first().map(|r| r.url.clone()));

        let result = DetectionResult {
            kind,
            verdict: Verdict::Yes,
            reason: verdict.reason.trim().to_string(),
            evidence_quote: verdict.evidence.trim().to_string(),
            evidence_url: url,
        };
        Ok(self.finish(kind, message, TrackOutcome::Detected(result)))
    }

    // ========================================================================
    // ABSORBING ENTRY POINTS
    // ========================================================================

    /// Track A with every failure absorbed into `None`.
    pub async fn check_contradiction(&self, message: &MessageRecord) -> Option<DetectionResult> {
        let class = JobKind::ContradictionCheck.default_priority();
        self.absorb(DetectionKind::Contradiction, message, self.run_contradiction(message, class).await)
    }

    /// Track B with every failure absorbed into `None`.
    pub async fn check_misinformation(&self, message: &MessageRecord) -> Option<DetectionResult> {
        let class = JobKind::MisinformationCheck.default_priority();
        self.absorb(DetectionKind::Misinformation, message, self.run_misinformation(message, class).await)
    }

    /// Both tracks. Misinformation runs whatever the contradiction outcome.
    pub async fn check_all(&self, message: &MessageRecord) -> Vec<DetectionResult> {
        let (contradiction, misinformation) = tokio::join!(
            self.check_contradiction(message),
            self.check_misinformation(message)
        );
        contradiction.into_iter().chain(misinformation).collect()
    }

    pub(crate) fn absorb(
        &self,
        kind: DetectionKind,
        message: &MessageRecord,
        outcome: VeritasResult<TrackOutcome>,
    ) -> Option<DetectionResult> {
        match outcome {
            Ok(outcome) => outcome.into_detection(),
            Err(e) => {
                warn!(
                    kind = kind.as_str(),
                    message_id = message.id,
                    error = %e,
                    "Detection failed, treating as no detection"
                );
                if let Some(m) = metrics() {
                    m.record_detection(kind.as_str(), "error");
                }
                None
            }
        }
    }

    fn finish(&self, kind: DetectionKind, message: &MessageRecord, outcome: TrackOutcome) -> TrackOutcome {
        match &outcome {
            TrackOutcome::Detected(result) => info!(
                kind = kind.as_str(),
                message_id = message.id,
                author_id = message.author_id,
                reason = %result.reason,
                "Detection"
            ),
            other => debug!(
                kind = kind.as_str(),
                message_id = message.id,
                outcome = other.label(),
                "Track finished without detection"
            ),
        }
        if let Some(m) = metrics() {
            m.record_detection(kind.as_str(), outcome.label());
        }
        outcome
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Upstreams;
    use veritas_core::{PipelineConfig, WebAnswerService, WebSearchService};
    use veritas_storage::InMemoryMessageStore;
    use veritas_test_utils::{
        FailingGeneration, MessageBuilder, ScriptedGeneration, StaticWebAnswer, StaticWebSearch,
    };

    struct Harness {
        orchestrator: DetectionOrchestrator,
        generation: Arc<ScriptedGeneration>,
    }

    fn harness_with(
        responses: Vec<&str>,
        web_answer: Arc<dyn WebAnswerService>,
        web_search: Option<Arc<dyn WebSearchService>>,
    ) -> Harness {
        let generation = Arc::new(ScriptedGeneration::new(responses));
        let ctx = PipelineContext::new(
            PipelineConfig::default(),
            Arc::new(InMemoryMessageStore::new()),
            Upstreams {
                generation: generation.clone(),
                web_answer,
                web_search,
            },
        );
        Harness {
            orchestrator: DetectionOrchestrator::new(Arc::new(ctx)),
            generation,
        }
    }

    fn harness(responses: Vec<&str>) -> Harness {
        harness_with(
            responses,
            Arc::new(StaticWebAnswer::grounded(
                "Vaccines are safe and effective.",
                &["https://who.int/vaccines"],
            )),
            None,
        )
    }

    async fn ingest(h: &Harness, id: u64, content: &str) -> MessageRecord {
        let record = MessageBuilder::new(id).author(7).scope(1).content(content).build();
        h.orchestrator.context().ingest(&record).await.unwrap();
        record
    }

    const FLAT_YES: &str = r#"Sure. {"contradiction": "yes", "reason": "shape changed", "evidence": "The earth is flat"}"#;

    #[tokio::test]
    async fn test_contradiction_detected_with_deep_link() {
        let h = harness(vec![FLAT_YES]);
        let prior = ingest(&h, 1, "The earth is flat").await;
        let current = ingest(&h, 2, "The earth is round").await;

        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        let TrackOutcome::Detected(result) = outcome else {
            panic!("expected detection, got {:?}", outcome);
        };
        assert_eq!(result.evidence_quote, "The earth is flat");
        assert_eq!(result.evidence_url, Some(prior.deep_link()));
        assert_eq!(h.generation.calls(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_evidence_discarded() {
        let h = harness(vec![
            r#"{"contradiction": "yes", "reason": "x", "evidence": "Birds are not real"}"#,
        ]);
        ingest(&h, 1, "The earth is flat").await;
        let current = ingest(&h, 2, "The earth is round").await;

        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::UnverifiableEvidence));
    }

    #[tokio::test]
    async fn test_no_history_skips_without_generation() {
        let h = harness(vec![FLAT_YES]);
        let current = ingest(&h, 1, "The earth is round").await;
        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::NoHistory));
        assert_eq!(h.generation.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_of_latest_skipped() {
        let h = harness(vec![FLAT_YES]);
        ingest(&h, 1, "The earth is flat").await;
        let current = ingest(&h, 2, "the earth is FLAT!").await;
        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::Duplicate));
    }

    #[tokio::test]
    async fn test_trivial_prior_messages_are_not_history() {
        let h = harness(vec![FLAT_YES]);
        ingest(&h, 1, "lol").await;
        ingest(&h, 2, "ok thanks bro").await;
        let current = ingest(&h, 3, "The earth is round").await;
        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::NoHistory));
    }

    #[tokio::test]
    async fn test_malformed_and_negative_verdicts() {
        let h = harness(vec!["I cannot answer that.", r#"{"contradiction": false}"#]);
        ingest(&h, 1, "The earth is flat").await;
        let current = ingest(&h, 2, "The earth is round").await;

        let first = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(first, TrackOutcome::Skipped(SkipReason::MalformedResponse));
        let second = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(second, TrackOutcome::Clear);
    }

    #[tokio::test]
    async fn test_validator_suppresses_hedged_history() {
        let h = harness(vec![
            r#"{"contradiction": "yes", "reason": "x", "evidence": "I think the earth might be flat"}"#,
        ]);
        ingest(&h, 1, "I think the earth might be flat honestly").await;
        let current = ingest(&h, 2, "The earth is round").await;
        let outcome = h
            .orchestrator
            .run_contradiction(&current, PriorityClass::Classification)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::Invalidated));
    }

    #[tokio::test]
    async fn test_foreign_command_skips_both_tracks() {
        let h = harness(vec![FLAT_YES]);
        let current = ingest(&h, 1, "!play vaccines don't work").await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::ForeignCommand));
        assert!(h.orchestrator.check_all(&current).await.is_empty());
        assert_eq!(h.generation.calls(), 0);
    }

    #[tokio::test]
    async fn test_misinformation_detected_with_cited_url() {
        let h = harness(vec![
            r#"{"misinformation": "yes", "reason": "Vaccines are effective", "evidence": "WHO data", "url": ""}"#,
        ]);
        let current = ingest(&h, 1, "vaccines don't work").await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        let TrackOutcome::Detected(result) = outcome else {
            panic!("expected detection, got {:?}", outcome);
        };
        assert_eq!(result.kind, DetectionKind::Misinformation);
        assert_eq!(result.evidence_url.as_deref(), Some("https://who.int/vaccines"));
    }

    #[tokio::test]
    async fn test_no_grounding_skips_generation() {
        let h = harness_with(
            vec![r#"{"misinformation": "yes", "reason": "r"}"#],
            Arc::new(StaticWebAnswer::grounded("No results found for this query.", &[])),
            None,
        );
        let current = ingest(&h, 1, "vaccines don't work").await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::NoGrounding));
        assert_eq!(h.generation.calls(), 0);
    }

    #[tokio::test]
    async fn test_positive_without_reason_is_malformed() {
        let h = harness(vec![r#"{"misinformation": "yes", "reason": "  "}"#]);
        let current = ingest(&h, 1, "vaccines don't work").await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::MalformedResponse));
    }

    #[tokio::test]
    async fn test_search_fills_missing_citations() {
        let h = harness_with(
            vec![r#"{"misinformation": "yes", "reason": "false claim"}"#],
            Arc::new(StaticWebAnswer::grounded("Vaccines are effective.", &[])),
            Some(Arc::new(StaticWebSearch::new(&[(
                "CDC",
                "https://cdc.gov/vaccines",
                "Vaccines work",
            )]))),
        );
        let current = ingest(&h, 1, "vaccines don't work").await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        let result = outcome.into_detection().unwrap();
        assert_eq!(result.evidence_url.as_deref(), Some("https://cdc.gov/vaccines"));
        assert!(h.generation.last_prompt().unwrap().contains("Vaccines work"));
    }

    #[tokio::test]
    async fn test_too_long_skipped() {
        let h = harness(vec![]);
        let long = format!("vaccines don't work {}", "because ".repeat(200));
        let current = ingest(&h, 1, &long).await;
        let outcome = h
            .orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::Skipped(SkipReason::TooLong));
    }

    #[tokio::test]
    async fn test_upstream_failure_absorbed() {
        let ctx = PipelineContext::new(
            PipelineConfig::default(),
            Arc::new(InMemoryMessageStore::new()),
            Upstreams {
                generation: Arc::new(FailingGeneration::new()),
                web_answer: Arc::new(StaticWebAnswer::grounded("Vaccines work.", &["https://who.int"])),
                web_search: None,
            },
        );
        let orchestrator = DetectionOrchestrator::new(Arc::new(ctx));
        let current = MessageBuilder::new(1).content("vaccines don't work").build();
        orchestrator.context().ingest(&current).await.unwrap();

        assert!(orchestrator
            .run_misinformation(&current, PriorityClass::FactCheck)
            .await
            .is_err());
        assert!(orchestrator.check_misinformation(&current).await.is_none());
    }
}
