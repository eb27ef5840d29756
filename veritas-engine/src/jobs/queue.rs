//! Job queues and worker pools.
//!
//! One queue per job kind. A dispatcher task takes jobs in submission order
//! and starts a worker for each as soon as one of the queue's `concurrency`
//! slots is free. A failing attempt is retried after an exponentially
//! growing backoff until `max_attempts` is reached; the job is then marked
//! failed and kept in a bounded ring for inspection.

use super::handler::JobHandler;
use crate::telemetry::metrics;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use veritas_core::{
    Job, JobError, JobKind, JobOutput, JobPayload, JobQueueConfig, JobState, PriorityClass,
    QueueSettings,
};

// ============================================================================
// HANDLE
// ============================================================================

/// Caller's handle on a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub correlation_id: Uuid,
    rx: oneshot::Receiver<Option<JobOutput>>,
}

impl JobHandle {
    /// Wait for the job's output.
    ///
    /// Timeout, exhaustion after retries and queue shutdown all yield
    /// `None`, the same as "no result".
    pub async fn await_completion(self, timeout: Duration) -> Option<JobOutput> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(output)) => output,
            Ok(Err(_)) => None,
            Err(_) => {
                debug!(job_id = %self.job_id, kind = %self.kind, "Timed out awaiting job");
                None
            }
        }
    }
}

// ============================================================================
// RETENTION
// ============================================================================

/// Bounded rings of finished jobs.
#[derive(Debug)]
struct Retention {
    completed: Mutex<VecDeque<Job>>,
    failed: Mutex<VecDeque<Job>>,
    keep_completed: usize,
    keep_failed: usize,
}

impl Retention {
    fn new(config: &JobQueueConfig) -> Self {
        Self {
            completed: Mutex::new(VecDeque::new()),
            failed: Mutex::new(VecDeque::new()),
            keep_completed: config.keep_completed,
            keep_failed: config.keep_failed,
        }
    }

    fn push(ring: &Mutex<VecDeque<Job>>, cap: usize, job: Job) {
        if cap == 0 {
            return;
        }
        let mut ring = ring.lock().unwrap_or_else(|e| e.into_inner());
        while ring.len() >= cap {
            ring.pop_front();
        }
        ring.push_back(job);
    }

    fn completed(&self, job: Job) {
        Self::push(&self.completed, self.keep_completed, job);
    }

    fn failed(&self, job: Job) {
        Self::push(&self.failed, self.keep_failed, job);
    }

    fn snapshot(ring: &Mutex<VecDeque<Job>>) -> Vec<Job> {
        ring.lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

// ============================================================================
// QUEUE
// ============================================================================

struct QueuedJob {
    job: Job,
    reply: oneshot::Sender<Option<JobOutput>>,
}

/// A named queue with its own worker pool.
pub struct JobQueue {
    kind: JobKind,
    config: JobQueueConfig,
    tx: mpsc::UnboundedSender<QueuedJob>,
    slots: Arc<Semaphore>,
    retention: Arc<Retention>,
    dispatcher: JoinHandle<()>,
}

impl JobQueue {
    /// Start the queue's dispatcher. Must be called inside a tokio runtime.
    pub fn start(kind: JobKind, config: JobQueueConfig, handler: Arc<dyn JobHandler>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let slots = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let retention = Arc::new(Retention::new(&config));

        let dispatcher = tokio::spawn(dispatch(
            kind,
            config.clone(),
            handler,
            rx,
            Arc::clone(&slots),
            Arc::clone(&retention),
        ));

        info!(
            queue = kind.queue_name(),
            concurrency = config.concurrency,
            max_attempts = config.max_attempts,
            "Job queue started"
        );

        Self {
            kind,
            config,
            tx,
            slots,
            retention,
            dispatcher,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn config(&self) -> &JobQueueConfig {
        &self.config
    }

    /// Enqueue a job.
    pub fn submit(&self, job: Job) -> Result<JobHandle, JobError> {
        if job.payload.kind() != self.kind {
            return Err(JobError::PayloadMismatch { kind: self.kind });
        }

        let (reply, rx) = oneshot::channel();
        let handle = JobHandle {
            job_id: job.id,
            kind: self.kind,
            correlation_id: job.correlation_id,
            rx,
        };
        debug!(
            queue = self.kind.queue_name(),
            job_id = %job.id,
            correlation_id = %job.correlation_id,
            "Job submitted"
        );
        self.tx
            .send(QueuedJob { job, reply })
            .map_err(|_| JobError::QueueClosed { kind: self.kind })?;
        Ok(handle)
    }

    /// Recently completed jobs, oldest first.
    pub fn completed_jobs(&self) -> Vec<Job> {
        Retention::snapshot(&self.retention.completed)
    }

    /// Jobs that exhausted their attempts, oldest first.
    pub fn failed_jobs(&self) -> Vec<Job> {
        Retention::snapshot(&self.retention.failed)
    }

    /// Stop accepting jobs, finish everything already queued, and wait for
    /// running workers.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.dispatcher.await {
            warn!(queue = self.kind.queue_name(), error = %e, "Dispatcher task failed");
        }
        let permits = self.config.concurrency.max(1) as u32;
        let _ = self.slots.acquire_many(permits).await;
        info!(queue = self.kind.queue_name(), "Job queue stopped");
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish()
    }
}

async fn dispatch(
    kind: JobKind,
    config: JobQueueConfig,
    handler: Arc<dyn JobHandler>,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    slots: Arc<Semaphore>,
    retention: Arc<Retention>,
) {
    while let Some(QueuedJob { job, reply }) = rx.recv().await {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let handler = Arc::clone(&handler);
        let retention = Arc::clone(&retention);
        let config = config.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let output = run_job(kind, job, &config, handler.as_ref(), &retention).await;
            let _ = reply.send(output);
        });
    }
    debug!(queue = kind.queue_name(), "Dispatcher drained");
}

/// Run every attempt of one job. Returns `None` once attempts are exhausted.
async fn run_job(
    kind: JobKind,
    mut job: Job,
    config: &JobQueueConfig,
    handler: &dyn JobHandler,
    retention: &Retention,
) -> Option<JobOutput> {
    let queue = kind.queue_name();
    let max_attempts = config.max_attempts.max(1);

    loop {
        job.attempts += 1;
        job.state = JobState::Active;

        match handler.handle(&job).await {
            Ok(output) => {
                job.state = JobState::Completed;
                debug!(queue, job_id = %job.id, attempt = job.attempts, "Job completed");
                record(queue, "completed");
                retention.completed(job);
                return Some(output);
            }
            Err(e) => {
                job.last_error = Some(e.to_string());

                if job.attempts >= max_attempts {
                    job.state = JobState::Failed;
                    let exhausted = JobError::Exhausted {
                        attempts: job.attempts,
                        last_error: e.to_string(),
                    };
                    warn!(
                        queue,
                        job_id = %job.id,
                        correlation_id = %job.correlation_id,
                        error = %exhausted,
                        "Job failed permanently"
                    );
                    record(queue, "failed");
                    retention.failed(job);
                    return None;
                }

                let delay = config.backoff_for(job.attempts);
                job.state = JobState::Retrying;
                warn!(
                    queue,
                    job_id = %job.id,
                    attempt = job.attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Job attempt failed, retrying"
                );
                record(queue, "retried");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn record(queue: &str, outcome: &str) {
    if let Some(m) = metrics() {
        m.record_job(queue, outcome);
    }
}

// ============================================================================
// QUEUE SET
// ============================================================================

/// One queue per job kind.
#[derive(Debug)]
pub struct JobQueues {
    queues: HashMap<JobKind, JobQueue>,
}

impl JobQueues {
    /// Start a queue for every job kind, all sharing `handler`.
    pub fn start(settings: &QueueSettings, handler: Arc<dyn JobHandler>) -> Self {
        let queues = JobKind::ALL
            .iter()
            .map(|&kind| {
                (
                    kind,
                    JobQueue::start(kind, settings.for_kind(kind).clone(), Arc::clone(&handler)),
                )
            })
            .collect();
        Self { queues }
    }

    pub fn queue(&self, kind: JobKind) -> Option<&JobQueue> {
        self.queues.get(&kind)
    }

    /// Submit a payload to the queue for `kind`.
    pub fn submit(
        &self,
        kind: JobKind,
        payload: JobPayload,
        priority: PriorityClass,
    ) -> Result<JobHandle, JobError> {
        if payload.kind() != kind {
            return Err(JobError::PayloadMismatch { kind });
        }
        let queue = self
            .queues
            .get(&kind)
            .ok_or(JobError::QueueClosed { kind })?;
        queue.submit(Job::new(payload, priority))
    }

    /// Submit with the kind's default priority class.
    pub fn submit_default(&self, payload: JobPayload) -> Result<JobHandle, JobError> {
        let kind = payload.kind();
        self.submit(kind, payload, kind.default_priority())
    }

    pub async fn shutdown(self) {
        for (_, queue) in self.queues {
            queue.shutdown().await;
        }
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
