//! Background Jobs for VERITAS
//!
//! Detection and assistant work runs through named job queues, one per
//! [`JobKind`](veritas_core::JobKind), each with its own bounded worker pool
//! and retry policy.
//!
//! ```ignore
//! let handler = Arc::new(PipelineJobHandler::new(Arc::clone(&ctx)));
//! let queues = JobQueues::start(&config.queues, handler);
//! let handle = queues.submit_default(JobPayload::ContradictionCheck { message })?;
//! let output = handle.await_completion(Duration::from_secs(30)).await;
//! queues.shutdown().await;
//! ```

pub mod handler;
pub mod queue;

pub use handler::{JobHandler, PipelineJobHandler};
pub use queue::{JobHandle, JobQueue, JobQueues};
