//! Tracing subscriber initialization
//!
//! One `tracing-subscriber` registry with an env filter and either a JSON
//! or a human-readable fmt layer, writing to stderr so stdout stays free
//! for NDJSON output.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "veritas_engine=info,veritas_llm=info,warn";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of human-readable output.
    pub json: bool,
    /// Service name attached to the startup event.
    pub service_name: String,
    /// Service version
    pub service_version: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            service_name: "veritas-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl TelemetryConfig {
    /// # Environment Variables
    /// - `VERITAS_LOG_JSON`: `true`/`1` for JSON output (default: false)
    /// - `VERITAS_SERVICE_NAME` (default: "veritas-engine")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            json: std::env::var("VERITAS_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            service_name: std::env::var("VERITAS_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to init subscriber: {0}")]
    SubscriberInit(String),
}

/// Initialize the global tracing subscriber. Call once at startup.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        json = config.json,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "veritas-engine");
        assert!(!config.json);
    }
}
