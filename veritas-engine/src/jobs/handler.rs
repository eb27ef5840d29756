//! Job handlers: what a worker does with one job.

use crate::assist::Assistant;
use crate::context::PipelineContext;
use crate::detect::DetectionOrchestrator;
use async_trait::async_trait;
use std::sync::Arc;
use veritas_core::{Job, JobOutput, JobPayload, VeritasResult};

/// Executes one attempt of a job. An `Err` makes the queue retry.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> VeritasResult<JobOutput>;
}

/// Handler running the detection tracks and assistant tasks.
#[derive(Debug, Clone)]
pub struct PipelineJobHandler {
    orchestrator: DetectionOrchestrator,
    assistant: Assistant,
}

impl PipelineJobHandler {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            orchestrator: DetectionOrchestrator::new(Arc::clone(&ctx)),
            assistant: Assistant::new(ctx),
        }
    }
}

#[async_trait]
impl JobHandler for PipelineJobHandler {
    async fn handle(&self, job: &Job) -> VeritasResult<JobOutput> {
        match &job.payload {
            JobPayload::ContradictionCheck { message } => {
                let outcome = self
                    .orchestrator
                    .run_contradiction(message, job.priority)
                    .await?;
                Ok(JobOutput::Detection(outcome.into_detection()))
            }
            JobPayload::MisinformationCheck { message } => {
                let outcome = self
                    .orchestrator
                    .run_misinformation(message, job.priority)
                    .await?;
                Ok(JobOutput::Detection(outcome.into_detection()))
            }
            JobPayload::Summarization {
                scope_id,
                channel_id,
                limit,
            } => {
                let summary = self
                    .assistant
                    .summarize_scope(*scope_id, *channel_id, *limit)
                    .await?;
                Ok(JobOutput::Summary(summary))
            }
            JobPayload::InteractiveReply { message, question } => {
                let reply = self.assistant.reply(message, question).await?;
                Ok(JobOutput::Reply(reply))
            }
        }
    }
}
