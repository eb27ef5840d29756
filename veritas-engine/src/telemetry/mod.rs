//! Telemetry: tracing subscriber setup and Prometheus metrics.

pub mod metrics;
pub mod tracer;

pub use metrics::{gather_metrics, metrics, VeritasMetrics, METRICS};
pub use tracer::{init_tracing, TelemetryConfig, TelemetryError, DEFAULT_LOG_FILTER};
