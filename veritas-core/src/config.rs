//! Configuration types
//!
//! Every section has sane `Default`s, a `from_env()` constructor reading
//! `VERITAS_*` variables, and participates in `PipelineConfig::validate()`.
//! A `ConfigError` is fatal at startup.

use crate::{ConfigError, JobKind, PriorityClass};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_SUCCESS_THRESHOLD: u32 = 2;
pub const DEFAULT_BREAKER_OPEN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_GATE_MAX_QUEUE_DEPTH: usize = 64;

/// Upper bound on `JobQueueConfig::max_attempts`; past it the doubling
/// backoff would stop growing.
pub const MAX_JOB_ATTEMPTS: u32 = 21;

pub const DEFAULT_AUTHOR_HISTORY_LEN: usize = 50;
pub const DEFAULT_SCOPE_HISTORY_LEN: usize = 200;
pub const DEFAULT_HISTORY_MAX_KEYS: usize = 10_000;
pub const DEFAULT_ANALYSIS_MAX_ENTRIES: usize = 5_000;
pub const DEFAULT_ANALYSIS_TTL_SECS: u64 = 3600;
pub const DEFAULT_VALIDATION_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.25;

pub const DEFAULT_SUBSTANTIVE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_HISTORY_WINDOW: usize = 20;
pub const DEFAULT_MISINFORMATION_MAX_CHARS: usize = 1000;
pub const DEFAULT_SEARCH_RESULT_COUNT: usize = 3;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MESSAGE_RETENTION_SECS: u64 = 30 * 24 * 3600;

pub const DEFAULT_GENERATION_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_ANSWER_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_ANSWER_MODEL: &str = "sonar";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.search.brave.com/res/v1";
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Candidate generation models, tried in order.
pub const DEFAULT_MODELS: &[&str] = &[
    "openai/gpt-4o-mini",
    "meta-llama/llama-3.1-70b-instruct",
    "mistralai/mistral-small",
];

// ============================================================================
// ENV HELPERS
// ============================================================================

/// Read and parse an env var, falling back to `default` when unset.
/// A set-but-unparseable value is a configuration error, not a silent default.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw,
            reason: "could not parse".to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    env_or(key, default_secs).map(Duration::from_secs)
}

fn env_millis(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    env_or(key, default_ms).map(Duration::from_millis)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn at_least<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    min: T,
) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("must be at least {}", min),
        });
    }
    Ok(())
}

fn positive_duration(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", value),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// BREAKER
// ============================================================================

/// Circuit breaker parameters (one breaker instance per upstream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures in Closed before opening.
    pub failure_threshold: u32,
    /// Consecutive HalfOpen successes needed to close.
    pub success_threshold: u32,
    /// Time the circuit stays open before a probe is allowed.
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_BREAKER_SUCCESS_THRESHOLD,
            open_timeout: Duration::from_secs(DEFAULT_BREAKER_OPEN_TIMEOUT_SECS),
        }
    }
}

impl BreakerConfig {
    /// Create BreakerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `VERITAS_BREAKER_FAILURE_THRESHOLD`: Failures before opening (default: 5)
    /// - `VERITAS_BREAKER_SUCCESS_THRESHOLD`: Half-open successes to close (default: 2)
    /// - `VERITAS_BREAKER_OPEN_TIMEOUT_SECS`: How long the circuit stays open (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            failure_threshold: env_or(
                "VERITAS_BREAKER_FAILURE_THRESHOLD",
                DEFAULT_BREAKER_FAILURE_THRESHOLD,
            )?,
            success_threshold: env_or(
                "VERITAS_BREAKER_SUCCESS_THRESHOLD",
                DEFAULT_BREAKER_SUCCESS_THRESHOLD,
            )?,
            open_timeout: env_secs(
                "VERITAS_BREAKER_OPEN_TIMEOUT_SECS",
                DEFAULT_BREAKER_OPEN_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("breaker.failure_threshold", self.failure_threshold, 1)?;
        at_least("breaker.success_threshold", self.success_threshold, 1)?;
        positive_duration("breaker.open_timeout", self.open_timeout)
    }
}

// ============================================================================
// GATE
// ============================================================================

/// Per-class concurrency limits for one upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    pub interactive_reply: usize,
    pub fact_check: usize,
    pub classification: usize,
    pub summarization: usize,
    /// Maximum waiters per class before admission fails fast.
    pub max_queue_depth: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            interactive_reply: 4,
            fact_check: 3,
            classification: 2,
            summarization: 1,
            max_queue_depth: DEFAULT_GATE_MAX_QUEUE_DEPTH,
        }
    }
}

impl GateConfig {
    /// Create GateConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `VERITAS_GATE_INTERACTIVE_REPLY` (default: 4)
    /// - `VERITAS_GATE_FACT_CHECK` (default: 3)
    /// - `VERITAS_GATE_CLASSIFICATION` (default: 2)
    /// - `VERITAS_GATE_SUMMARIZATION` (default: 1)
    /// - `VERITAS_GATE_MAX_QUEUE_DEPTH` (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            interactive_reply: env_or("VERITAS_GATE_INTERACTIVE_REPLY", defaults.interactive_reply)?,
            fact_check: env_or("VERITAS_GATE_FACT_CHECK", defaults.fact_check)?,
            classification: env_or("VERITAS_GATE_CLASSIFICATION", defaults.classification)?,
            summarization: env_or("VERITAS_GATE_SUMMARIZATION", defaults.summarization)?,
            max_queue_depth: env_or("VERITAS_GATE_MAX_QUEUE_DEPTH", defaults.max_queue_depth)?,
        })
    }

    /// Concurrency limit for a class.
    pub fn limit_for(&self, class: PriorityClass) -> usize {
        match class {
            PriorityClass::InteractiveReply => self.interactive_reply,
            PriorityClass::FactCheck => self.fact_check,
            PriorityClass::Classification => self.classification,
            PriorityClass::Summarization => self.summarization,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for class in PriorityClass::ALL {
            at_least(&format!("gate.{}", class), self.limit_for(class), 1)?;
        }
        at_least("gate.max_queue_depth", self.max_queue_depth, 1)
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// Sizes and lifetimes for the tiered cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Messages kept per (author, scope) sequence.
    pub author_history_len: usize,
    /// Messages kept per scope sequence.
    pub scope_history_len: usize,
    /// Distinct history keys before LRU eviction.
    pub history_max_keys: usize,
    pub analysis_max_entries: usize,
    pub analysis_ttl: Duration,
    pub validation_max_entries: usize,
    /// Share of TTL-cache entries evicted on overflow.
    pub eviction_fraction: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            author_history_len: DEFAULT_AUTHOR_HISTORY_LEN,
            scope_history_len: DEFAULT_SCOPE_HISTORY_LEN,
            history_max_keys: DEFAULT_HISTORY_MAX_KEYS,
            analysis_max_entries: DEFAULT_ANALYSIS_MAX_ENTRIES,
            analysis_ttl: Duration::from_secs(DEFAULT_ANALYSIS_TTL_SECS),
            validation_max_entries: DEFAULT_VALIDATION_MAX_ENTRIES,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
        }
    }
}

impl CacheSettings {
    /// Create CacheSettings from `VERITAS_CACHE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            author_history_len: env_or(
                "VERITAS_CACHE_AUTHOR_HISTORY_LEN",
                defaults.author_history_len,
            )?,
            scope_history_len: env_or(
                "VERITAS_CACHE_SCOPE_HISTORY_LEN",
                defaults.scope_history_len,
            )?,
            history_max_keys: env_or("VERITAS_CACHE_HISTORY_MAX_KEYS", defaults.history_max_keys)?,
            analysis_max_entries: env_or(
                "VERITAS_CACHE_ANALYSIS_MAX_ENTRIES",
                defaults.analysis_max_entries,
            )?,
            analysis_ttl: env_secs("VERITAS_CACHE_ANALYSIS_TTL_SECS", DEFAULT_ANALYSIS_TTL_SECS)?,
            validation_max_entries: env_or(
                "VERITAS_CACHE_VALIDATION_MAX_ENTRIES",
                defaults.validation_max_entries,
            )?,
            eviction_fraction: env_or(
                "VERITAS_CACHE_EVICTION_FRACTION",
                defaults.eviction_fraction,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("cache.author_history_len", self.author_history_len, 1)?;
        at_least("cache.scope_history_len", self.scope_history_len, 1)?;
        at_least("cache.history_max_keys", self.history_max_keys, 1)?;
        at_least("cache.analysis_max_entries", self.analysis_max_entries, 1)?;
        at_least("cache.validation_max_entries", self.validation_max_entries, 1)?;
        positive_duration("cache.analysis_ttl", self.analysis_ttl)?;
        if !(0.2..=0.3).contains(&self.eviction_fraction) {
            return Err(ConfigError::InvalidValue {
                field: "cache.eviction_fraction".to_string(),
                value: self.eviction_fraction.to_string(),
                reason: "must be between 0.2 and 0.3".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// DETECTION
// ============================================================================

/// Parameters for both detection tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum substantiveness score for either track to proceed.
    pub substantive_threshold: f32,
    /// Prior statements shown to the model (oldest-first window).
    pub history_window: usize,
    /// Messages longer than this are not fact-checked.
    pub misinformation_max_chars: usize,
    /// Candidate generation models in fallback order.
    pub models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Search hits fetched when the web answer carries no citations.
    pub search_result_count: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            substantive_threshold: DEFAULT_SUBSTANTIVE_THRESHOLD,
            history_window: DEFAULT_HISTORY_WINDOW,
            misinformation_max_chars: DEFAULT_MISINFORMATION_MAX_CHARS,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: 0.0,
            max_tokens: 400,
            search_result_count: DEFAULT_SEARCH_RESULT_COUNT,
        }
    }
}

impl DetectionConfig {
    /// Create DetectionConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `VERITAS_SUBSTANTIVE_THRESHOLD` (default: 0.3)
    /// - `VERITAS_HISTORY_WINDOW` (default: 20)
    /// - `VERITAS_MISINFORMATION_MAX_CHARS` (default: 1000)
    /// - `VERITAS_MODELS`: comma-separated candidate list
    /// - `VERITAS_TEMPERATURE` (default: 0.0)
    /// - `VERITAS_MAX_TOKENS` (default: 400)
    /// - `VERITAS_SEARCH_RESULT_COUNT` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let models = match env_opt("VERITAS_MODELS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.models.clone(),
        };

        Ok(Self {
            substantive_threshold: env_or(
                "VERITAS_SUBSTANTIVE_THRESHOLD",
                defaults.substantive_threshold,
            )?,
            history_window: env_or("VERITAS_HISTORY_WINDOW", defaults.history_window)?,
            misinformation_max_chars: env_or(
                "VERITAS_MISINFORMATION_MAX_CHARS",
                defaults.misinformation_max_chars,
            )?,
            models,
            temperature: env_or("VERITAS_TEMPERATURE", defaults.temperature)?,
            max_tokens: env_or("VERITAS_MAX_TOKENS", defaults.max_tokens)?,
            search_result_count: env_or(
                "VERITAS_SEARCH_RESULT_COUNT",
                defaults.search_result_count,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.substantive_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "detection.substantive_threshold".to_string(),
                value: self.substantive_threshold.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.models.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "detection.models".to_string(),
            });
        }
        at_least("detection.history_window", self.history_window, 1)?;
        at_least("detection.misinformation_max_chars", self.misinformation_max_chars, 1)?;
        at_least("detection.max_tokens", self.max_tokens, 1)
    }
}

// ============================================================================
// JOB QUEUES
// ============================================================================

/// Settings for one named job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQueueConfig {
    /// Jobs of this kind in flight at once.
    pub concurrency: usize,
    /// Attempts before a job is marked failed.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each further attempt.
    pub backoff_base: Duration,
    /// Completed jobs retained for inspection.
    pub keep_completed: usize,
    /// Failed jobs retained for inspection.
    pub keep_failed: usize,
}

impl JobQueueConfig {
    pub fn new(concurrency: usize, max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            concurrency,
            max_attempts,
            backoff_base,
            keep_completed: 100,
            keep_failed: 500,
        }
    }

    /// Backoff to wait after failed attempt `attempt` (1-based):
    /// `base * 2^(attempt-1)`, strictly increasing.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_JOB_ATTEMPTS - 1);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    fn from_env_prefixed(prefix: &str, defaults: Self) -> Result<Self, ConfigError> {
        Ok(Self {
            concurrency: env_or(&format!("{}_CONCURRENCY", prefix), defaults.concurrency)?,
            max_attempts: env_or(&format!("{}_MAX_ATTEMPTS", prefix), defaults.max_attempts)?,
            backoff_base: env_millis(
                &format!("{}_BACKOFF_MS", prefix),
                defaults.backoff_base.as_millis() as u64,
            )?,
            keep_completed: env_or(&format!("{}_KEEP_COMPLETED", prefix), defaults.keep_completed)?,
            keep_failed: env_or(&format!("{}_KEEP_FAILED", prefix), defaults.keep_failed)?,
        })
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        at_least(&format!("queues.{}.concurrency", name), self.concurrency, 1)?;
        let attempts_field = format!("queues.{}.max_attempts", name);
        at_least(&attempts_field, self.max_attempts, 1)?;
        if self.max_attempts > MAX_JOB_ATTEMPTS {
            return Err(ConfigError::InvalidValue {
                field: attempts_field,
                value: self.max_attempts.to_string(),
                reason: format!("must be at most {}", MAX_JOB_ATTEMPTS),
            });
        }
        positive_duration(&format!("queues.{}.backoff_base", name), self.backoff_base)?;
        let longest_exponent = self.max_attempts.saturating_sub(1);
        if self.backoff_base.checked_mul(1u32 << longest_exponent).is_none() {
            return Err(ConfigError::InvalidValue {
                field: format!("queues.{}.backoff_base", name),
                value: format!("{:?}", self.backoff_base),
                reason: "backoff overflows before the last attempt".to_string(),
            });
        }
        Ok(())
    }
}

/// One queue configuration per job kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    pub contradiction: JobQueueConfig,
    pub misinformation: JobQueueConfig,
    pub summarization: JobQueueConfig,
    pub interactive_reply: JobQueueConfig,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            contradiction: JobQueueConfig::new(2, 3, Duration::from_secs(1)),
            misinformation: JobQueueConfig::new(2, 3, Duration::from_secs(1)),
            summarization: JobQueueConfig::new(1, 2, Duration::from_secs(2)),
            interactive_reply: JobQueueConfig::new(4, 2, Duration::from_millis(500)),
        }
    }
}

impl QueueSettings {
    /// Create QueueSettings from environment variables, e.g.
    /// `VERITAS_QUEUE_CONTRADICTION_CONCURRENCY`, `VERITAS_QUEUE_SUMMARIZATION_MAX_ATTEMPTS`,
    /// `VERITAS_QUEUE_INTERACTIVE_REPLY_BACKOFF_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            contradiction: JobQueueConfig::from_env_prefixed(
                "VERITAS_QUEUE_CONTRADICTION",
                defaults.contradiction,
            )?,
            misinformation: JobQueueConfig::from_env_prefixed(
                "VERITAS_QUEUE_MISINFORMATION",
                defaults.misinformation,
            )?,
            summarization: JobQueueConfig::from_env_prefixed(
                "VERITAS_QUEUE_SUMMARIZATION",
                defaults.summarization,
            )?,
            interactive_reply: JobQueueConfig::from_env_prefixed(
                "VERITAS_QUEUE_INTERACTIVE_REPLY",
                defaults.interactive_reply,
            )?,
        })
    }

    pub fn for_kind(&self, kind: JobKind) -> &JobQueueConfig {
        match kind {
            JobKind::ContradictionCheck => &self.contradiction,
            JobKind::MisinformationCheck => &self.misinformation,
            JobKind::Summarization => &self.summarization,
            JobKind::InteractiveReply => &self.interactive_reply,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in JobKind::ALL {
            self.for_kind(kind).validate(kind.queue_name())?;
        }
        Ok(())
    }
}

// ============================================================================
// MAINTENANCE
// ============================================================================

/// Background maintenance: TTL sweeps and message retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub sweep_interval: Duration,
    /// Stored messages older than this are purged.
    pub message_retention: Duration,
    /// Maximum messages deleted per sweep.
    pub purge_batch_size: usize,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            message_retention: Duration::from_secs(DEFAULT_MESSAGE_RETENTION_SECS),
            purge_batch_size: 1000,
        }
    }
}

impl MaintenanceConfig {
    /// Create MaintenanceConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `VERITAS_SWEEP_INTERVAL_SECS` (default: 300)
    /// - `VERITAS_MESSAGE_RETENTION_SECS` (default: 30 days)
    /// - `VERITAS_PURGE_BATCH_SIZE` (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            sweep_interval: env_secs("VERITAS_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
            message_retention: env_secs(
                "VERITAS_MESSAGE_RETENTION_SECS",
                DEFAULT_MESSAGE_RETENTION_SECS,
            )?,
            purge_batch_size: env_or("VERITAS_PURGE_BATCH_SIZE", defaults.purge_batch_size)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_duration("maintenance.sweep_interval", self.sweep_interval)?;
        positive_duration("maintenance.message_retention", self.message_retention)?;
        at_least("maintenance.purge_batch_size", self.purge_batch_size, 1)
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Connection settings for the HTTP providers.
///
/// Keys stay wrapped in `SecretString`; only the provider clients expose
/// them when building request headers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub generation_api_key: SecretString,
    pub generation_base_url: String,
    /// Web-answer key; when absent the generation key is reused.
    pub answer_api_key: Option<SecretString>,
    pub answer_base_url: String,
    pub answer_model: String,
    /// Web-search key; search is disabled without one.
    pub search_api_key: Option<SecretString>,
    pub search_base_url: String,
    pub requests_per_minute: u32,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    /// Create ProviderSettings from environment variables.
    ///
    /// # Environment Variables
    /// - `VERITAS_GENERATION_API_KEY` (required)
    /// - `VERITAS_GENERATION_BASE_URL` (default: OpenRouter)
    /// - `VERITAS_ANSWER_API_KEY`, `VERITAS_ANSWER_BASE_URL`, `VERITAS_ANSWER_MODEL`
    /// - `VERITAS_SEARCH_API_KEY`, `VERITAS_SEARCH_BASE_URL`
    /// - `VERITAS_REQUESTS_PER_MINUTE` (default: 60)
    /// - `VERITAS_REQUEST_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_api_key = env_opt("VERITAS_GENERATION_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "VERITAS_GENERATION_API_KEY".to_string(),
            })?;

        let settings = Self {
            generation_api_key,
            generation_base_url: env_opt("VERITAS_GENERATION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GENERATION_BASE_URL.to_string()),
            answer_api_key: env_opt("VERITAS_ANSWER_API_KEY").map(SecretString::from),
            answer_base_url: env_opt("VERITAS_ANSWER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANSWER_BASE_URL.to_string()),
            answer_model: env_opt("VERITAS_ANSWER_MODEL")
                .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string()),
            search_api_key: env_opt("VERITAS_SEARCH_API_KEY").map(SecretString::from),
            search_base_url: env_opt("VERITAS_SEARCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            requests_per_minute: env_or(
                "VERITAS_REQUESTS_PER_MINUTE",
                DEFAULT_REQUESTS_PER_MINUTE,
            )?,
            request_timeout: env_secs(
                "VERITAS_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("generation_base_url", &self.generation_base_url),
            ("answer_base_url", &self.answer_base_url),
            ("search_base_url", &self.search_base_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.clone(),
                    reason: "must be an http(s) url".to_string(),
                });
            }
        }
        at_least("requests_per_minute", self.requests_per_minute, 1)?;
        positive_duration("request_timeout", self.request_timeout)
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

/// Master configuration for the detection pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub breaker: BreakerConfig,
    pub gate: GateConfig,
    pub cache: CacheSettings,
    pub detection: DetectionConfig,
    pub queues: QueueSettings,
    pub maintenance: MaintenanceConfig,
}

impl PipelineConfig {
    /// Load every section from the environment and validate the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            breaker: BreakerConfig::from_env()?,
            gate: GateConfig::from_env()?,
            cache: CacheSettings::from_env()?,
            detection: DetectionConfig::from_env()?,
            queues: QueueSettings::from_env()?,
            maintenance: MaintenanceConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.breaker.validate()?;
        self.gate.validate()?;
        self.cache.validate()?;
        self.detection.validate()?;
        self.queues.validate()?;
        self.maintenance.validate()
    }
}

// ============================================================================
// TESTS
// ============================================================================
