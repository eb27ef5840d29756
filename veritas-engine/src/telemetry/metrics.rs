//! Prometheus Metrics Definitions
//!
//! All VERITAS metrics live in a dedicated registry created once on first
//! use. Registration failure is logged and metrics become no-ops; it never
//! stops the pipeline.

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Upstream call latency buckets (seconds)
/// Covers: 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
const UPSTREAM_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance - initialized once on first access
pub static METRICS: Lazy<Option<VeritasMetrics>> = Lazy::new(|| match VeritasMetrics::new() {
    Ok(metrics) => Some(metrics),
    Err(e) => {
        tracing::warn!(error = %e, "Failed to register metrics; metrics disabled");
        None
    }
});

/// Access the global metrics, if registration succeeded.
pub fn metrics() -> Option<&'static VeritasMetrics> {
    METRICS.as_ref()
}

/// Container for all VERITAS metrics.
#[derive(Clone)]
pub struct VeritasMetrics {
    registry: Registry,

    /// Track outcomes - labels: kind, outcome
    pub detections_total: IntCounterVec,

    /// Upstream calls - labels: service, outcome
    pub upstream_calls_total: IntCounterVec,

    /// Upstream call duration - labels: service
    pub upstream_duration_seconds: HistogramVec,

    /// Calls rejected by an open breaker - labels: service
    pub breaker_rejections_total: IntCounterVec,

    /// Breaker state (0 closed, 1 half-open, 2 open) - labels: service
    pub breaker_state: IntGaugeVec,

    /// Admissions refused by a saturated gate - labels: service, class
    pub gate_saturations_total: IntCounterVec,

    /// Job outcomes - labels: queue, outcome
    pub jobs_total: IntCounterVec,

    /// Cache lookups - labels: cache, result
    pub cache_lookups_total: IntCounterVec,
}

impl VeritasMetrics {
    /// Create and register all metrics with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let detections_total = IntCounterVec::new(
            Opts::new("veritas_detections_total", "Detection track outcomes"),
            &["kind", "outcome"],
        )?;
        let upstream_calls_total = IntCounterVec::new(
            Opts::new("veritas_upstream_calls_total", "Calls into upstream services"),
            &["service", "outcome"],
        )?;
        let upstream_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "veritas_upstream_duration_seconds",
                "Upstream call duration in seconds",
            )
            .buckets(UPSTREAM_LATENCY_BUCKETS.to_vec()),
            &["service"],
        )?;
        let breaker_rejections_total = IntCounterVec::new(
            Opts::new(
                "veritas_breaker_rejections_total",
                "Calls rejected by an open circuit breaker",
            ),
            &["service"],
        )?;
        let breaker_state = IntGaugeVec::new(
            Opts::new(
                "veritas_breaker_state",
                "Circuit breaker state (0 closed, 1 half-open, 2 open)",
            ),
            &["service"],
        )?;
        let gate_saturations_total = IntCounterVec::new(
            Opts::new(
                "veritas_gate_saturations_total",
                "Admissions refused by a saturated concurrency gate",
            ),
            &["service", "class"],
        )?;
        let jobs_total = IntCounterVec::new(
            Opts::new("veritas_jobs_total", "Job outcomes"),
            &["queue", "outcome"],
        )?;
        let cache_lookups_total = IntCounterVec::new(
            Opts::new("veritas_cache_lookups_total", "Cache lookups by result"),
            &["cache", "result"],
        )?;

        registry.register(Box::new(detections_total.clone()))?;
        registry.register(Box::new(upstream_calls_total.clone()))?;
        registry.register(Box::new(upstream_duration_seconds.clone()))?;
        registry.register(Box::new(breaker_rejections_total.clone()))?;
        registry.register(Box::new(breaker_state.clone()))?;
        registry.register(Box::new(gate_saturations_total.clone()))?;
        registry.register(Box::new(jobs_total.clone()))?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        Ok(Self {
            registry,
            detections_total,
            upstream_calls_total,
            upstream_duration_seconds,
            breaker_rejections_total,
            breaker_state,
            gate_saturations_total,
            jobs_total,
            cache_lookups_total,
        })
    }

    pub fn record_detection(&self, kind: &str, outcome: &str) {
        self.detections_total.with_label_values(&[kind, outcome]).inc();
    }

    pub fn record_upstream_call(&self, service: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        self.upstream_calls_total
            .with_label_values(&[service, outcome])
            .inc();
        self.upstream_duration_seconds
            .with_label_values(&[service])
            .observe(duration_secs);
    }

    pub fn record_breaker_rejection(&self, service: &str) {
        self.breaker_rejections_total
            .with_label_values(&[service])
            .inc();
    }

    pub fn set_breaker_state(&self, service: &str, state: i64) {
        self.breaker_state.with_label_values(&[service]).set(state);
    }

    pub fn record_gate_saturation(&self, service: &str, class: &str) {
        self.gate_saturations_total
            .with_label_values(&[service, class])
            .inc();
    }

    pub fn record_job(&self, queue: &str, outcome: &str) {
        self.jobs_total.with_label_values(&[queue, outcome]).inc();
    }

    pub fn record_cache_lookup(&self, cache: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups_total
            .with_label_values(&[cache, result])
            .inc();
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn gather(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to encode metrics");
                String::new()
            })
    }
}

/// Render the global metrics, or an empty string when metrics are disabled.
pub fn gather_metrics() -> String {
    metrics().map(VeritasMetrics::gather).unwrap_or_default()
}
