//! Error types for VERITAS operations

use crate::{JobKind, PriorityClass};
use thiserror::Error;

/// Failures talking to an external service (generation, web answer, search).
///
/// All of these are absorbed at the orchestrator boundary and surface to
/// callers as "no result".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Circuit open for {service}, failing fast")]
    BreakerOpen { service: String },

    #[error("Request to {service} failed with status {status}: {message}")]
    RequestFailed {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {service}, retry after {retry_after_ms}ms")]
    RateLimited {
        service: String,
        retry_after_ms: u64,
    },

    #[error("Request to {service} timed out")]
    Timeout { service: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("All candidate models failed: {models:?}")]
    AllModelsFailed { models: Vec<String> },

    #[error("Admission queue for {service}/{class} is saturated ({depth} waiting)")]
    GateSaturated {
        service: String,
        class: PriorityClass,
        depth: usize,
    },
}

impl UpstreamError {
    /// Whether the failure says something about the health of the upstream
    /// (and therefore should count against its breaker).
    pub fn counts_against_breaker(&self) -> bool {
        !matches!(self, Self::BreakerOpen { .. } | Self::GateSaturated { .. })
    }
}

/// Durable message store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for message {id}: {reason}")]
    InsertFailed { id: u64, reason: String },

    #[error("Message {id} already stored")]
    Duplicate { id: u64 },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors. Fatal at startup, before any work is accepted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Job queue errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job exhausted after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Queue {kind} is closed")]
    QueueClosed { kind: JobKind },

    #[error("Job payload does not match handler for {kind}")]
    PayloadMismatch { kind: JobKind },
}

/// Master error type for all VERITAS errors.
#[derive(Debug, Clone, Error)]
pub enum VeritasError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

/// Result type alias for VERITAS operations.
pub type VeritasResult<T> = Result<T, VeritasError>;

// =============================================================================
// TESTS
// =============================================================================
