//! VERITAS Engine - Resilient Detection Pipeline
//!
//! Flags contradictions and misinformation in chat messages while keeping
//! the system responsive when upstream services misbehave.
//!
//! - [`resilience`]: per-upstream circuit breakers and per-class admission gates
//! - [`guarded`]: the only path to the upstream services
//! - [`detect`]: pre-filter, content analyzer, validator and the two tracks
//! - [`assist`]: scope summaries and interactive replies
//! - [`jobs`]: named queues with bounded workers and exponential retry
//! - [`maintenance`]: cache sweeps and message retention
//! - [`context`]: shared state, built once and passed explicitly

pub mod assist;
pub mod constants;
pub mod context;
pub mod detect;
pub mod guarded;
pub mod jobs;
pub mod maintenance;
pub mod resilience;
pub mod telemetry;

pub use assist::Assistant;
pub use context::{CacheHealth, HealthSnapshot, PipelineContext, Upstreams};
pub use detect::DetectionOrchestrator;
pub use guarded::{GuardedServices, UpstreamGuard};
pub use jobs::{JobHandle, JobHandler, JobQueue, JobQueues, PipelineJobHandler};
pub use maintenance::{maintenance_task, run_maintenance_cycle, MaintenanceMetrics, MaintenanceSnapshot};
pub use resilience::{CircuitBreaker, ConcurrencyGate};
