//! Contradiction validator.
//!
//! Re-checks a (history, current) pair the model already flagged as
//! contradictory. Rules are ordered and the first one that decides wins;
//! only the opposing-claims rule affirms a contradiction, the rest can only
//! suppress it.

use super::vocab::{
    clusters_of, contains_any, AGREEMENT_CLUSTERS, NEGATORS, OPPOSING_PAIRS, TEMPORAL_MARKERS,
    TOPIC_CLUSTERS, UNCERTAINTY_MARKERS,
};
use veritas_core::normalize_text;

/// The rule that decided a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    IdenticalText,
    TopicMismatch,
    OpposingClaims,
    SharedAgreement,
    Uncertainty,
    TemporalQualifier,
    Default,
}

impl ValidationRule {
    pub fn allows_contradiction(&self) -> bool {
        matches!(self, Self::OpposingClaims | Self::Default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdenticalText => "identical_text",
            Self::TopicMismatch => "topic_mismatch",
            Self::OpposingClaims => "opposing_claims",
            Self::SharedAgreement => "shared_agreement",
            Self::Uncertainty => "uncertainty",
            Self::TemporalQualifier => "temporal_qualifier",
            Self::Default => "default",
        }
    }
}

/// Whether `current` may stand as a contradiction of `history`.
pub fn validate(history: &str, current: &str) -> bool {
    evaluate(history, current).allows_contradiction()
}

/// Run the rules in order and report which one decided.
pub fn evaluate(history: &str, current: &str) -> ValidationRule {
    let a = normalize_text(history);
    let b = normalize_text(current);

    if a == b {
        return ValidationRule::IdenticalText;
    }

    let topics_a = clusters_of(&a, TOPIC_CLUSTERS);
    let topics_b = clusters_of(&b, TOPIC_CLUSTERS);
    if !topics_a.is_empty()
        && !topics_b.is_empty()
        && !topics_a.iter().any(|t| topics_b.contains(t))
    {
        return ValidationRule::TopicMismatch;
    }

    if has_opposing_pair(&a, &b) || is_negated_restatement(&a, &b) {
        return ValidationRule::OpposingClaims;
    }

    let agree_a = clusters_of(&a, AGREEMENT_CLUSTERS);
    let agree_b = clusters_of(&b, AGREEMENT_CLUSTERS);
    if !agree_a.is_empty() && agree_a == agree_b {
        return ValidationRule::SharedAgreement;
    }

    if contains_any(&a, UNCERTAINTY_MARKERS) || contains_any(&b, UNCERTAINTY_MARKERS) {
        return ValidationRule::Uncertainty;
    }
    if contains_any(&a, TEMPORAL_MARKERS) || contains_any(&b, TEMPORAL_MARKERS) {
        return ValidationRule::TemporalQualifier;
    }

    ValidationRule::Default
}

/// One side asserts, the other negates, for some assertion/negation pair.
fn has_opposing_pair(a: &str, b: &str) -> bool {
    OPPOSING_PAIRS.iter().any(|(positive, negative)| {
        let a_neg = contains_any(a, negative);
        let b_neg = contains_any(b, negative);
        let a_pos = contains_any(&strip_phrases(a, negative), positive);
        let b_pos = contains_any(&strip_phrases(b, negative), positive);
        (a_pos && !a_neg && b_neg && !b_pos) || (b_pos && !b_neg && a_neg && !a_pos)
    })
}

/// "X is flat" vs "X is not flat": same words once negators are dropped,
/// and exactly one side negates.
fn is_negated_restatement(a: &str, b: &str) -> bool {
    let core = |s: &str| -> Vec<String> {
        s.split_whitespace()
            .filter(|t| !NEGATORS.contains(t))
            .map(str::to_string)
            .collect()
    };
    let negates = |s: &str| s.split_whitespace().any(|t| NEGATORS.contains(&t));

    let core_a = core(a);
    !core_a.is_empty() && core_a == core(b) && negates(a) != negates(b)
}

/// Remove every whole-word occurrence of `phrases` from normalized text.
fn strip_phrases(normalized: &str, phrases: &[&str]) -> String {
    let mut padded = format!(" {} ", normalized);
    for phrase in phrases {
        let needle = format!(" {} ", phrase);
        while padded.contains(&needle) {
            padded = padded.replacen(&needle, " ", 1);
        }
    }
    padded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_rejected() {
        assert!(!validate("The earth is round", "The earth is round"));
        assert_eq!(
            evaluate("The earth is round!", "the EARTH is round"),
            ValidationRule::IdenticalText
        );
    }

    #[test]
    fn test_topic_mismatch_rejected() {
        assert!(!validate("vaccines work", "the earth is flat"));
        assert_eq!(
            evaluate("vaccines work", "the earth is flat"),
            ValidationRule::TopicMismatch
        );
    }

    #[test]
    fn test_negation_pair_affirmed() {
        assert!(validate("X is safe", "X is dangerous"));
        assert!(validate("vaccines work", "vaccines don't work"));
        assert!(validate("that is true", "that is not true"));
        assert_eq!(
            evaluate("the moon landing was real", "the moon landing was a hoax"),
            ValidationRule::OpposingClaims
        );
    }

    #[test]
    fn test_negated_restatement_affirmed() {
        assert_eq!(
            evaluate("the earth is flat", "the earth is not flat"),
            ValidationRule::OpposingClaims
        );
    }

    #[test]
    fn test_uncertainty_rejected() {
        assert!(!validate("I think it might be flat", "It is round"));
    }

    #[test]
    fn test_temporal_rejected() {
        assert_eq!(
            evaluate("I used to think the earth was flat", "The earth is round"),
            ValidationRule::TemporalQualifier
        );
    }

    #[test]
    fn test_agreement_cluster_rejected() {
        assert_eq!(
            evaluate("the earth is round", "the earth is a sphere"),
            ValidationRule::SharedAgreement
        );
    }

    #[test]
    fn test_flat_vs_round_allowed() {
        assert_eq!(
            evaluate("The earth is flat", "The earth is round"),
            ValidationRule::Default
        );
        assert!(validate("The earth is flat", "The earth is round"));
    }

    #[test]
    fn test_strip_phrases() {
        assert_eq!(strip_phrases("it is not true", &["not true"]), "it is");
        assert_eq!(strip_phrases("true", &["not true"]), "true");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_identical_never_contradicts(s in "\\PC{0,120}") {
            prop_assert!(!validate(&s, &s));
        }

        #[test]
        fn prop_symmetric_outcome(a in "[a-z ']{0,60}", b in "[a-z ']{0,60}") {
            prop_assert_eq!(validate(&a, &b), validate(&b, &a));
        }

        #[test]
        fn prop_uncertainty_suppresses_non_opposing(s in "[a-z ]{1,40}") {
            let hedged = format!("maybe {}", s);
            let rule = evaluate(&hedged, "the earth is round");
            prop_assert!(
                !rule.allows_contradiction() || rule == ValidationRule::OpposingClaims
            );
        }
    }
}
