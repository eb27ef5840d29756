//! Constants for the VERITAS engine
//!
//! Service labels and detection tuning values that are not worth exposing
//! as configuration.

// ============================================================================
// UPSTREAM LABELS
// ============================================================================

/// Label for the text-generation upstream (breaker, gate, metrics).
pub const SERVICE_GENERATION: &str = "generation";

/// Label for the web-answer upstream.
pub const SERVICE_WEB_ANSWER: &str = "web_answer";

/// Label for the web-search upstream.
pub const SERVICE_WEB_SEARCH: &str = "web_search";

// ============================================================================
// EVIDENCE LOCATION
// ============================================================================

/// Minimum normalized length of the contained side of a fuzzy evidence match.
pub const MIN_FUZZY_MATCH_CHARS: usize = 8;

// ============================================================================
// ANALYZER WEIGHTS
// ============================================================================

pub const ANALYZER_BASELINE: f32 = 0.5;
pub const WEIGHT_TOPIC: f32 = 0.25;
pub const WEIGHT_CLAIM: f32 = 0.1;
pub const WEIGHT_NEGATION: f32 = 0.1;
pub const WEIGHT_EVIDENCE: f32 = 0.1;
pub const WEIGHT_ABSOLUTE: f32 = 0.05;
pub const WEIGHT_MEDIUM_LENGTH: f32 = 0.05;
pub const WEIGHT_LONG_LENGTH: f32 = 0.1;
pub const PENALTY_UNCERTAINTY: f32 = 0.15;
pub const PENALTY_VERY_SHORT: f32 = 0.35;

/// Highest score a topic-free message under `PREFILTER_MIN_CHARS` can reach,
/// whatever bonuses it collects. Below the default substantive threshold.
pub const TINY_MESSAGE_CEILING: f32 = 0.2;

/// Character counts behind the length adjustments.
pub const VERY_SHORT_CHARS: usize = 15;
pub const MEDIUM_LENGTH_CHARS: usize = 50;
pub const LONG_LENGTH_CHARS: usize = 120;

// ============================================================================
// PRE-FILTER
// ============================================================================

/// Trimmed messages shorter than this are always trivial.
pub const PREFILTER_MIN_CHARS: usize = 4;

/// Trimmed messages longer than this are never trivial.
pub const PREFILTER_MAX_TRIVIAL_CHARS: usize = 100;

/// Token-count ceiling for the all-safe-vocabulary rule.
pub const PREFILTER_SAFE_TOKEN_LIMIT: usize = 5;

/// Token-count ceiling for the identical-tokens rule.
pub const PREFILTER_REPEAT_TOKEN_LIMIT: usize = 3;

// ============================================================================
// ASSISTANT
// ============================================================================

/// Maximum messages included in a scope summary.
pub const MAX_SUMMARY_MESSAGES: usize = 100;

/// Token budget for summaries and interactive replies.
pub const ASSIST_MAX_TOKENS: u32 = 500;

// ============================================================================
// DRIVER
// ============================================================================

/// How long the driver waits for one detection job before giving up on it.
pub const DRIVER_JOB_TIMEOUT_SECS: u64 = 120;

/// Upper bound on waiting for queues to drain at shutdown.
pub const DRIVER_SHUTDOWN_GRACE_SECS: u64 = 30;
