//! Entity types: messages, detection results, jobs and priority classes.

use crate::{Snowflake, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// MESSAGE RECORD
// ============================================================================

/// A chat message as stored in the durable message store.
///
/// Records are append-only and immutable once stored; they only leave the
/// store through the retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Snowflake,
    pub author_id: Snowflake,
    pub channel_id: Snowflake,
    /// Community/server partition the message belongs to.
    pub scope_id: Snowflake,
    pub content: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub is_bot: bool,
}

impl MessageRecord {
    /// Deep link to this message in the chat client.
    pub fn deep_link(&self) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            self.scope_id, self.channel_id, self.id
        )
    }
}

// ============================================================================
// DETECTION RESULTS
// ============================================================================

/// Which detection track produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionKind {
    Contradiction,
    Misinformation,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contradiction => "contradiction",
            Self::Misinformation => "misinformation",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary verdict reported by the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Lenient parse of a model-provided verdict word. Anything that is not
    /// clearly affirmative is a negative verdict.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" => Self::Yes,
            _ => Self::No,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// A positive detection, derived from model output and message history.
/// Not itself a system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub kind: DetectionKind,
    pub verdict: Verdict,
    pub reason: String,
    pub evidence_quote: String,
    pub evidence_url: Option<String>,
}

/// Why a detection track stopped without a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Pre-filter judged the message trivial.
    Trivial,
    /// Message is a command aimed at another bot.
    ForeignCommand,
    /// Author has no substantive prior messages in scope.
    NoHistory,
    /// Message repeats the author's most recent substantive message.
    Duplicate,
    /// Substantiveness score below threshold.
    LowSubstance,
    /// Message exceeds the length ceiling.
    TooLong,
    /// Web answer returned nothing to ground against.
    NoGrounding,
    /// Model output had no parseable structured verdict.
    MalformedResponse,
    /// Quoted evidence could not be found in history.
    UnverifiableEvidence,
    /// Contradiction validator rejected the flagged pair.
    Invalidated,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::ForeignCommand => "foreign_command",
            Self::NoHistory => "no_history",
            Self::Duplicate => "duplicate",
            Self::LowSubstance => "low_substance",
            Self::TooLong => "too_long",
            Self::NoGrounding => "no_grounding",
            Self::MalformedResponse => "malformed_response",
            Self::UnverifiableEvidence => "unverifiable_evidence",
            Self::Invalidated => "invalidated",
        }
    }
}

/// Outcome of one detection track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Detected(DetectionResult),
    /// The model answered and found nothing.
    Clear,
    Skipped(SkipReason),
}

impl TrackOutcome {
    pub fn into_detection(self) -> Option<DetectionResult> {
        match self {
            Self::Detected(result) => Some(result),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Detected(_) => "detected",
            Self::Clear => "clear",
            Self::Skipped(reason) => reason.as_str(),
        }
    }
}

// ============================================================================
// PRIORITY CLASSES
// ============================================================================

/// Admission class for calls into an upstream service.
///
/// Classes are independent: each has its own concurrency limit and FIFO
/// queue. There is no ordering between classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityClass {
    InteractiveReply,
    FactCheck,
    Classification,
    Summarization,
}

impl PriorityClass {
    pub const ALL: [PriorityClass; 4] = [
        PriorityClass::InteractiveReply,
        PriorityClass::FactCheck,
        PriorityClass::Classification,
        PriorityClass::Summarization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InteractiveReply => "interactive_reply",
            Self::FactCheck => "fact_check",
            Self::Classification => "classification",
            Self::Summarization => "summarization",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// JOBS
// ============================================================================

/// Job type; one queue and worker pool exists per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    ContradictionCheck,
    MisinformationCheck,
    Summarization,
    InteractiveReply,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::ContradictionCheck,
        JobKind::MisinformationCheck,
        JobKind::Summarization,
        JobKind::InteractiveReply,
    ];

    /// Queue name, also used as the metrics label.
    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::ContradictionCheck => "contradiction-check",
            Self::MisinformationCheck => "misinformation-check",
            Self::Summarization => "summarization",
            Self::InteractiveReply => "interactive-reply",
        }
    }

    /// Default gate class for the external calls a job of this kind makes.
    pub fn default_priority(&self) -> PriorityClass {
        match self {
            Self::ContradictionCheck => PriorityClass::Classification,
            Self::MisinformationCheck => PriorityClass::FactCheck,
            Self::Summarization => PriorityClass::Summarization,
            Self::InteractiveReply => PriorityClass::InteractiveReply,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_name())
    }
}

/// Work carried by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    ContradictionCheck {
        message: MessageRecord,
    },
    MisinformationCheck {
        message: MessageRecord,
    },
    Summarization {
        scope_id: Snowflake,
        channel_id: Option<Snowflake>,
        limit: usize,
    },
    InteractiveReply {
        message: MessageRecord,
        question: String,
    },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::ContradictionCheck { .. } => JobKind::ContradictionCheck,
            Self::MisinformationCheck { .. } => JobKind::MisinformationCheck,
            Self::Summarization { .. } => JobKind::Summarization,
            Self::InteractiveReply { .. } => JobKind::InteractiveReply,
        }
    }
}

/// Result produced by a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JobOutput {
    Detection(Option<DetectionResult>),
    Summary(Option<String>),
    Reply(Option<String>),
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Active,
    /// Waiting out a backoff before the next attempt.
    Retrying,
    Completed,
    Failed,
}

/// A unit of asynchronous work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub priority: PriorityClass,
    pub attempts: u32,
    pub correlation_id: Uuid,
    pub state: JobState,
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(payload: JobPayload, priority: PriorityClass) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: payload.kind(),
            payload,
            priority,
            attempts: 0,
            correlation_id: Uuid::now_v7(),
            state: JobState::Queued,
            last_error: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
