//! Circuit breaker for one upstream dependency.
//!
//! Closed: calls flow; consecutive failures are counted.
//! Open: calls fail fast with `UpstreamError::BreakerOpen` and the guarded
//! operation is never invoked until `open_timeout` has passed since the last
//! failure.
//! HalfOpen: exactly one probe may be in flight. `success_threshold`
//! consecutive probe successes close the circuit; any failure reopens it.

use crate::telemetry::metrics;
use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use veritas_core::{BreakerConfig, CircuitState, UpstreamError, UpstreamResult};

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    half_open_successes: u32,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Point-in-time view of a breaker, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_successes: u32,
}

/// Circuit breaker guarding one upstream.
pub struct CircuitBreaker {
    service: &'static str,
    config: BreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(service: &'static str, config: BreakerConfig) -> Self {
        Self {
            service,
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                half_open_successes: 0,
                last_failure_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State transitions never panic mid-update, so a poisoned guard
        // still holds a consistent state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            service: self.service.to_string(),
            state: inner.state,
            failure_count: inner.failure_count,
            half_open_successes: inner.half_open_successes,
        }
    }

    /// Run `op` through the breaker.
    ///
    /// Returns `UpstreamError::BreakerOpen` without calling `op` when the
    /// circuit is open (or a half-open probe is already in flight).
    pub async fn execute<F, Fut, T>(&self, op: F) -> UpstreamResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        let probe = self.admit()?;
        let mut guard = ProbeGuard {
            breaker: self,
            probe,
            settled: false,
        };

        let result = op().await;
        match &result {
            Ok(_) => self.on_success(),
            Err(e) if e.counts_against_breaker() => self.on_failure(e),
            Err(_) => self.release_probe(probe),
        }
        guard.settled = true;
        result
    }

    /// Decide whether a call may proceed. Returns whether it is the
    /// half-open probe.
    fn admit(&self) -> UpstreamResult<bool> {
        let mut inner = self.lock();
        let admitted = match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.open_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    inner.probe_in_flight = true;
                    info!(service = self.service, "Circuit half-open, allowing probe");
                    self.publish_state(CircuitState::HalfOpen);
                    Some(true)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                Some(true)
            }
            CircuitState::HalfOpen => None,
        };

        admitted.ok_or_else(|| self.rejection())
    }

    /// Fail fast when a call made now would be refused, without changing
    /// state. An elapsed open timeout passes so `execute` can take the probe.
    pub fn check_admission(&self) -> UpstreamResult<()> {
        let inner = self.lock();
        let refused = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => inner
                .last_failure_at
                .map(|at| at.elapsed() < self.config.open_timeout)
                .unwrap_or(false),
            CircuitState::HalfOpen => inner.probe_in_flight,
        };
        drop(inner);
        if refused {
            return Err(self.rejection());
        }
        Ok(())
    }

    fn rejection(&self) -> UpstreamError {
        debug!(service = self.service, "Circuit open, failing fast");
        if let Some(m) = metrics() {
            m.record_breaker_rejection(self.service);
        }
        UpstreamError::BreakerOpen {
            service: self.service.to_string(),
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.half_open_successes = 0;
                    inner.last_failure_at = None;
                    info!(service = self.service, "Circuit closed");
                    self.publish_state(CircuitState::Closed);
                }
            }
            // A call admitted while Closed may finish after another call
            // opened the circuit; its success does not close it.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, error: &UpstreamError) {
        let mut inner = self.lock();
        inner.last_failure_at = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        service = self.service,
                        failures = inner.failure_count,
                        error = %error,
                        "Circuit opened"
                    );
                    self.publish_state(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.half_open_successes = 0;
                inner.probe_in_flight = false;
                inner.failure_count += 1;
                warn!(service = self.service, error = %error, "Probe failed, circuit reopened");
                self.publish_state(CircuitState::Open);
            }
            CircuitState::Open => inner.failure_count += 1,
        }
    }

    fn release_probe(&self, probe: bool) {
        if probe {
            self.lock().probe_in_flight = false;
        }
    }

    fn publish_state(&self, state: CircuitState) {
        if let Some(m) = metrics() {
            let value = match state {
                CircuitState::Closed => 0,
                CircuitState::HalfOpen => 1,
                CircuitState::Open => 2,
            };
            m.set_breaker_state(self.service, value);
        }
    }

    /// Force the breaker back to Closed with all counters cleared.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.half_open_successes = 0;
        inner.last_failure_at = None;
        inner.probe_in_flight = false;
        self.publish_state(CircuitState::Closed);
    }
}

/// Frees the half-open probe slot if the probing future is dropped before
/// it settles.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release_probe(self.probe);
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("half_open_successes", &inner.half_open_successes)
            .finish()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
        }
    }

    fn boom() -> UpstreamError {
        UpstreamError::Timeout {
            service: "test".to_string(),
        }
    }

    async fn fail(breaker: &CircuitBreaker, calls: &AtomicU32) -> UpstreamResult<()> {
        breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(boom())
            })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker, calls: &AtomicU32) -> UpstreamResult<()> {
        breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
    }

    async fn open(breaker: &CircuitBreaker, calls: &AtomicU32) {
        for _ in 0..3 {
            let _ = fail(breaker, calls).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_and_fails_fast() {
        let breaker = CircuitBreaker::new("test", config());
        let calls = AtomicU32::new(0);
        open(&breaker, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, UpstreamError::BreakerOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "op must not run while open");

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(succeed(&breaker, &calls).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_in_closed_resets_failures() {
        let breaker = CircuitBreaker::new("test", config());
        let calls = AtomicU32::new(0);
        let _ = fail(&breaker, &calls).await;
        let _ = fail(&breaker, &calls).await;
        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.snapshot().failure_count, 0);
        let _ = fail(&breaker, &calls).await;
        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_closes_after_required_successes() {
        let breaker = CircuitBreaker::new("test", config());
        let calls = AtomicU32::new(0);
        open(&breaker, &calls).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.half_open_successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("test", config());
        let calls = AtomicU32::new(0);
        open(&breaker, &calls).await;

        tokio::time::advance(Duration::from_secs(31)).await;
        succeed(&breaker, &calls).await.unwrap();
        let _ = fail(&breaker, &calls).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.snapshot().half_open_successes, 0);

        // Failure time was refreshed: still open shortly after.
        tokio::time::advance(Duration::from_secs(10)).await;
        let before = calls.load(Ordering::SeqCst);
        assert!(succeed(&breaker, &calls).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_one_probe() {
        let breaker = CircuitBreaker::new("test", config());
        let calls = AtomicU32::new(0);
        open(&breaker, &calls).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let (probe_started_tx, probe_started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let probe = breaker.execute(move || async move {
            let _ = probe_started_tx.send(());
            let _ = release_rx.await;
            Ok::<_, UpstreamError>(())
        });
        let second = async {
            let _ = probe_started_rx.await;
            let result = succeed(&breaker, &calls).await;
            let _ = release_tx.send(());
            result
        };

        let (probe_result, second_result) = tokio::join!(probe, second);
        assert!(probe_result.is_ok());
        assert!(matches!(second_result, Err(UpstreamError::BreakerOpen { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_health_errors_do_not_count() {
        let breaker = CircuitBreaker::new("test", config());
        for _ in 0..10 {
            let _ = breaker
                .execute(|| async {
                    Err::<(), _>(UpstreamError::GateSaturated {
                        service: "test".to_string(),
                        class: veritas_core::PriorityClass::FactCheck,
                        depth: 1,
                    })
                })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breakers_are_independent() {
        let generation = CircuitBreaker::new("generation", config());
        let answer = CircuitBreaker::new("web_answer", config());
        let calls = AtomicU32::new(0);
        open(&generation, &calls).await;
        assert_eq!(answer.state(), CircuitState::Closed);
        assert!(succeed(&answer, &calls).await.is_ok());
    }
}
