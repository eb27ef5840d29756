//! Upstream services behind their gates and breakers.
//!
//! Every external call goes through `GuardedServices`. An open breaker
//! refuses the call before it queues at the gate; otherwise the caller
//! waits for a slot in its class lane and the call runs through the
//! breaker. Each service has its own breaker and gate.

use crate::constants::{SERVICE_GENERATION, SERVICE_WEB_ANSWER, SERVICE_WEB_SEARCH};
use crate::resilience::{BreakerSnapshot, CircuitBreaker, ConcurrencyGate, GateSnapshot};
use crate::telemetry::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use veritas_core::{
    BreakerConfig, GateConfig, GenerationRequest, GenerationResponse, GenerationService,
    PriorityClass, SearchResult, UpstreamError, UpstreamResult, WebAnswer, WebAnswerService,
    WebSearchService,
};

/// Breaker and gate pair for one upstream.
#[derive(Debug)]
pub struct UpstreamGuard {
    breaker: CircuitBreaker,
    gate: ConcurrencyGate,
}

impl UpstreamGuard {
    pub fn new(service: &'static str, breaker: &BreakerConfig, gate: &GateConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(service, breaker.clone()),
            gate: ConcurrencyGate::new(service, gate),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Admit through the gate, then run `op` through the breaker.
    ///
    /// The breaker is consulted again after the wait, since it may have
    /// opened while the caller was queued.
    pub async fn call<F, Fut, T>(&self, class: PriorityClass, op: F) -> UpstreamResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        self.breaker.check_admission()?;
        let _permit = self.gate.acquire(class).await?;
        let started = Instant::now();
        let result = self.breaker.execute(op).await;

        let rejected = matches!(result, Err(UpstreamError::BreakerOpen { .. }));
        if !rejected {
            if let Some(m) = metrics() {
                m.record_upstream_call(
                    self.breaker.service(),
                    result.is_ok(),
                    started.elapsed().as_secs_f64(),
                );
            }
        }
        result
    }
}

/// The pipeline's view of its external collaborators.
pub struct GuardedServices {
    generation: Arc<dyn GenerationService>,
    web_answer: Arc<dyn WebAnswerService>,
    web_search: Option<Arc<dyn WebSearchService>>,
    generation_guard: UpstreamGuard,
    web_answer_guard: UpstreamGuard,
    web_search_guard: UpstreamGuard,
}

impl GuardedServices {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        web_answer: Arc<dyn WebAnswerService>,
        web_search: Option<Arc<dyn WebSearchService>>,
        breaker: &BreakerConfig,
        gate: &GateConfig,
    ) -> Self {
        Self {
            generation,
            web_answer,
            web_search,
            generation_guard: UpstreamGuard::new(SERVICE_GENERATION, breaker, gate),
            web_answer_guard: UpstreamGuard::new(SERVICE_WEB_ANSWER, breaker, gate),
            web_search_guard: UpstreamGuard::new(SERVICE_WEB_SEARCH, breaker, gate),
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        class: PriorityClass,
    ) -> UpstreamResult<GenerationResponse> {
        let service = Arc::clone(&self.generation);
        self.generation_guard
            .call(class, || async move { service.generate(request).await })
            .await
    }

    pub async fn answer(&self, query: &str, class: PriorityClass) -> UpstreamResult<WebAnswer> {
        let service = Arc::clone(&self.web_answer);
        self.web_answer_guard
            .call(class, || async move { service.answer(query).await })
            .await
    }

    pub fn has_search(&self) -> bool {
        self.web_search.is_some()
    }

    /// Web search; an unconfigured search service yields no results.
    pub async fn search(
        &self,
        query: &str,
        result_count: usize,
        class: PriorityClass,
    ) -> UpstreamResult<Vec<SearchResult>> {
        let Some(service) = self.web_search.as_ref().map(Arc::clone) else {
            return Ok(Vec::new());
        };
        self.web_search_guard
            .call(class, || async move { service.search(query, result_count).await })
            .await
    }

    fn guards(&self) -> Vec<&UpstreamGuard> {
        let mut guards = vec![&self.generation_guard, &self.web_answer_guard];
        if self.web_search.is_some() {
            guards.push(&self.web_search_guard);
        }
        guards
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.guards()
            .into_iter()
            .map(|g| g.breaker().snapshot())
            .collect()
    }

    pub fn gate_snapshots(&self) -> Vec<GateSnapshot> {
        self.guards()
            .into_iter()
            .map(|g| g.gate().snapshot())
            .collect()
    }
}

impl std::fmt::Debug for GuardedServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedServices")
            .field("generation", &self.generation_guard)
            .field("web_answer", &self.web_answer_guard)
            .field("web_search_configured", &self.web_search.is_some())
            .finish()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
