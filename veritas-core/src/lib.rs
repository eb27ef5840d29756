//! VERITAS Core - Entity Types
//!
//! Pure data structures, error taxonomy, configuration and the external
//! service traits. All other crates depend on this one.
//! This crate contains no I/O and no pipeline logic.

pub mod config;
pub mod entities;
pub mod error;
pub mod llm;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use llm::*;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Chat-platform snowflake identifier (messages, authors, channels, scopes).
pub type Snowflake = u64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash used for cache keys.
pub type ContentHash = [u8; 32];

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

// ============================================================================
// TEXT NORMALIZATION
// ============================================================================

/// Normalize text for comparisons: lowercase, punctuation replaced by spaces,
/// whitespace collapsed. Apostrophes are kept so contractions survive
/// ("don't" stays one token).
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2019}' => '\'',
            c if c.is_alphanumeric() || c == '\'' => c,
            _ => ' ',
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key for content-derived results: hex SHA-256 of the normalized text.
pub fn content_cache_key(text: &str) -> String {
    hex::encode(compute_content_hash(normalize_text(text).as_bytes()))
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  The Earth, is ROUND!! "), "the earth is round");
    }

    #[test]
    fn test_normalize_keeps_contractions() {
        assert_eq!(normalize_text("Vaccines don\u{2019}t work."), "vaccines don't work");
    }

    #[test]
    fn test_content_cache_key_ignores_formatting() {
        assert_eq!(
            content_cache_key("The earth is flat"),
            content_cache_key("the EARTH is flat!")
        );
        assert_ne!(
            content_cache_key("The earth is flat"),
            content_cache_key("The earth is round")
        );
    }

    #[test]
    fn test_compute_content_hash_is_stable() {
        assert_eq!(compute_content_hash(b"abc"), compute_content_hash(b"abc"));
        assert_eq!(
            hex::encode(compute_content_hash(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
