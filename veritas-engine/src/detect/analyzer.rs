//! Content analyzer: substantiveness scoring.

use super::vocab::{
    clusters_of, contains_any, ABSOLUTE_MARKERS, EVIDENCE_MARKERS, NEGATORS, TEMPORAL_MARKERS,
    TOPIC_CLUSTERS, UNCERTAINTY_MARKERS,
};
use crate::constants::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use veritas_core::normalize_text;

static CLAIM_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\b(is|are|was|were|causes?|cures?|prevents?|proves?|never|always)\b").ok()
});

/// Substantiveness score plus the linguistic flags behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// In [0, 1].
    pub score: f32,
    pub has_uncertainty: bool,
    pub has_temporal_qualifier: bool,
    pub has_absolute_language: bool,
    pub has_evidence_markers: bool,
    pub has_high_impact_topic: bool,
}

impl ContentAnalysis {
    pub fn is_substantive(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Score a raw message. Pure; callers cache by content key.
pub fn analyze(text: &str) -> ContentAnalysis {
    let normalized = normalize_text(text);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let length = text.trim().chars().count();

    let has_topic = !clusters_of(&normalized, TOPIC_CLUSTERS).is_empty();
    let has_claim = CLAIM_PATTERN
        .as_ref()
        .map(|re| re.is_match(&normalized))
        .unwrap_or(false);
    let has_negation = tokens.iter().any(|t| NEGATORS.contains(t));
    let has_evidence = contains_any(&normalized, EVIDENCE_MARKERS) || text.contains('%');
    let has_absolute = contains_any(&normalized, ABSOLUTE_MARKERS);
    let has_uncertainty = contains_any(&normalized, UNCERTAINTY_MARKERS);
    let has_temporal = contains_any(&normalized, TEMPORAL_MARKERS);

    let mut score = ANALYZER_BASELINE;
    if has_topic {
        score += WEIGHT_TOPIC;
    }
    if has_claim {
        score += WEIGHT_CLAIM;
    }
    if has_negation {
        score += WEIGHT_NEGATION;
    }
    if has_evidence {
        score += WEIGHT_EVIDENCE;
    }
    if has_absolute {
        score += WEIGHT_ABSOLUTE;
    }
    if length > LONG_LENGTH_CHARS {
        score += WEIGHT_LONG_LENGTH;
    } else if length > MEDIUM_LENGTH_CHARS {
        score += WEIGHT_MEDIUM_LENGTH;
    }
    if has_uncertainty {
        score -= PENALTY_UNCERTAINTY;
    }
    if length < VERY_SHORT_CHARS && !has_topic {
        score -= PENALTY_VERY_SHORT;
    }
    if length < PREFILTER_MIN_CHARS && !has_topic {
        score = score.min(TINY_MESSAGE_CEILING);
    }

    ContentAnalysis {
        score: score.clamp(0.0, 1.0),
        has_uncertainty,
        has_temporal_qualifier: has_temporal,
        has_absolute_language: has_absolute,
        has_evidence_markers: has_evidence,
        has_high_impact_topic: has_topic,
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_score_in_unit_range(s in "\\PC{0,300}") {
            let score = analyze(&s).score;
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_three_chars_without_topic_below_threshold(s in "[a-z0-9%!?. ]{3}") {
            prop_assume!(!analyze(&s).has_high_impact_topic);
            prop_assert!(analyze(&s).score < veritas_core::DEFAULT_SUBSTANTIVE_THRESHOLD);
        }
    }
}
