//! Pipeline context: every shared piece of state the pipeline needs,
//! constructed once and passed explicitly.

use crate::detect::analyzer::{self, ContentAnalysis};
use crate::detect::validator;
use crate::guarded::GuardedServices;
use crate::resilience::{BreakerSnapshot, GateSnapshot};
use crate::telemetry::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use veritas_core::{
    content_cache_key, GenerationService, MessageRecord, PipelineConfig, VeritasResult,
    WebAnswerService, WebSearchService,
};
use veritas_storage::{BoundedLruCache, CacheStats, HistoryCache, MessageStore, TtlCache};

/// Upstream services handed to the context at construction.
#[derive(Clone)]
pub struct Upstreams {
    pub generation: Arc<dyn GenerationService>,
    pub web_answer: Arc<dyn WebAnswerService>,
    pub web_search: Option<Arc<dyn WebSearchService>>,
}

/// Cache usage in a health report.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub history: CacheStats,
    pub analysis: CacheStats,
    pub validation: CacheStats,
}

/// Point-in-time health of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub breakers: Vec<BreakerSnapshot>,
    pub gates: Vec<GateSnapshot>,
    pub caches: CacheHealth,
}

/// Shared pipeline state.
pub struct PipelineContext {
    config: PipelineConfig,
    store: Arc<dyn MessageStore>,
    history: HistoryCache,
    analysis: TtlCache<String, ContentAnalysis>,
    validation: BoundedLruCache<(String, String), bool>,
    services: GuardedServices,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig, store: Arc<dyn MessageStore>, upstreams: Upstreams) -> Self {
        let cache = &config.cache;
        let history = HistoryCache::new(cache);
        let analysis = TtlCache::new(
            "analysis",
            cache.analysis_max_entries,
            cache.analysis_ttl,
            cache.eviction_fraction,
        );
        let validation = BoundedLruCache::new("validation", cache.validation_max_entries);
        let services = GuardedServices::new(
            upstreams.generation,
            upstreams.web_answer,
            upstreams.web_search,
            &config.breaker,
            &config.gate,
        );

        Self {
            config,
            store,
            history,
            analysis,
            validation,
            services,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn services(&self) -> &GuardedServices {
        &self.services
    }

    /// Store a message, then make it visible to cached history.
    ///
    /// The cache is only touched after the store accepted the record, so a
    /// message never serves as prior history before it is durable.
    pub async fn ingest(&self, record: &MessageRecord) -> VeritasResult<()> {
        self.store.insert(record).await?;
        self.history.record(record);
        debug!(
            message_id = record.id,
            author_id = record.author_id,
            scope_id = record.scope_id,
            "Message ingested"
        );
        Ok(())
    }

    /// Content analysis, cached by normalized-content key.
    pub fn analyze(&self, text: &str) -> ContentAnalysis {
        let key = content_cache_key(text);
        if let Some(cached) = self.analysis.get(&key) {
            record_lookup(self.analysis.name(), true);
            return cached;
        }
        record_lookup(self.analysis.name(), false);

        let analysis = analyzer::analyze(text);
        self.analysis.insert(key, analysis);
        analysis
    }

    /// Contradiction validation, cached by the exact text pair.
    pub fn validate(&self, evidence: &str, current: &str) -> bool {
        let key = (evidence.to_string(), current.to_string());
        if let Some(cached) = self.validation.get(&key) {
            record_lookup(self.validation.name(), true);
            return cached;
        }
        record_lookup(self.validation.name(), false);

        let rule = validator::evaluate(evidence, current);
        let allowed = rule.allows_contradiction();
        debug!(rule = rule.as_str(), allowed, "Contradiction validated");
        self.validation.put(key, allowed);
        allowed
    }

    /// Drop expired analysis entries. Returns how many were removed.
    pub fn sweep_caches(&self) -> usize {
        self.analysis.sweep_expired()
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            breakers: self.services.breaker_snapshots(),
            gates: self.services.gate_snapshots(),
            caches: CacheHealth {
                history: self.history.stats(),
                analysis: self.analysis.stats(),
                validation: self.validation.stats(),
            },
        }
    }
}

fn record_lookup(cache: &str, hit: bool) {
    if let Some(m) = metrics() {
        m.record_cache_lookup(cache, hit);
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("history", &self.history)
            .field("analysis", &self.analysis)
            .field("validation", &self.validation)
            .field("services", &self.services)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_core::StorageError;
    use veritas_storage::InMemoryMessageStore;
    use veritas_test_utils::{MessageBuilder, ScriptedGeneration, StaticWebAnswer};

    fn context() -> PipelineContext {
        PipelineContext::new(
            PipelineConfig::default(),
            Arc::new(InMemoryMessageStore::new()),
            Upstreams {
                generation: Arc::new(ScriptedGeneration::new(Vec::<String>::new())),
                web_answer: Arc::new(StaticWebAnswer::empty()),
                web_search: None,
            },
        )
    }

    #[tokio::test]
    async fn test_ingest_then_history_visible() {
        let ctx = context();
        let record = MessageBuilder::new(1).author(5).scope(9).content("hello world").build();
        ctx.ingest(&record).await.unwrap();

        let history = ctx
            .history()
            .author_history(ctx.store(), 5, 9, 10)
            .await
            .unwrap();
        assert_eq!(history, vec![record.clone()]);

        let err = ctx.ingest(&record).await.unwrap_err();
        assert!(matches!(
            err,
            veritas_core::VeritasError::Storage(StorageError::Duplicate { id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_analysis_cached_by_normalized_content() {
        let ctx = context();
        let first = ctx.analyze("Vaccines don't work!");
        let second = ctx.analyze("vaccines DON'T work");
        assert_eq!(first, second);
        let stats = ctx.health().caches.analysis;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_validation_cached_by_exact_pair() {
        let ctx = context();
        assert!(ctx.validate("The earth is flat", "The earth is round"));
        assert!(ctx.validate("The earth is flat", "The earth is round"));
        assert!(!ctx.validate("The earth is round", "The earth is round"));
        let stats = ctx.health().caches.validation;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_health_serializes() {
        let ctx = context();
        let json = serde_json::to_value(ctx.health()).unwrap();
        assert_eq!(json["breakers"].as_array().unwrap().len(), 2);
        assert_eq!(json["breakers"][0]["state"], "Closed");
    }
}
