//! Heuristic pre-filter.
//!
//! Decides, without any I/O, whether a message is worth analysing at all.
//! Checks run cheapest first: command prefixes, length bounds, filler
//! vocabulary, compiled patterns, then token rules.

use super::vocab::{DISCOURSE_MARKERS, FILLER_PHRASES, SAFE_TOKENS};
use crate::constants::{
    PREFILTER_MAX_TRIVIAL_CHARS, PREFILTER_MIN_CHARS, PREFILTER_REPEAT_TOKEN_LIMIT,
    PREFILTER_SAFE_TOKEN_LIMIT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use veritas_core::normalize_text;

/// Commands addressed to other bots in the same channels.
pub const FOREIGN_COMMAND_PREFIXES: &[&str] = &[
    "!play", "!skip", "!stop", "!pause", "!resume", "!queue", "!np", "!loop", "!volume",
    "!rank", "!level", "!daily", "!balance", "!bal", "!work", "!help", "!meme", "!roll",
    "!ban", "!kick", "!mute", "!warn", "!purge", "!clear", "!poll", "!remind", "!afk",
    "?rank", "?level", "?help", "?ban", "?warn", "?tag", ";;play", ";;skip", ";;queue",
    "-play", "-skip", "-queue", ".play", ".skip", "p!", "m!", "pls ", "owo ", "$w", "$m",
    "t!", "r!", "s!", ">play",
];

/// Why a message was judged trivial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrivialReason {
    TooShort,
    NoAlphanumeric,
    Filler,
    Pattern(&'static str),
    RepeatedCharacters,
    SingleToken,
    RepeatedTokens,
    SafeVocabulary,
}

/// Pre-filter verdict for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Worth analysing.
    Pass,
    Trivial(TrivialReason),
    ForeignCommand,
}

impl FilterOutcome {
    /// Whether detection should stop here.
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Pass)
    }
}

static TRIVIAL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("custom_emoji", r"^(<a?:\w+:\d+>\s*)+$"),
        ("shortcode_emoji", r"^(:[a-z0-9_+\-]+:\s*)+$"),
        ("bare_number", r"^[+\-]?[\d.,\s%$]+$"),
        ("acronym", r"^[A-Z]{2,5}[!?.]*$"),
        (
            "canned_reaction",
            r"(?i)^(same|this|mood|real|true|facts|based|this\s+is\s+the\s+way|big\s+if\s+true|w\s+take|l\s+take|hard\s+agree|no\s+way|let'?s\s+go+|sheesh+)[!.\s]*$",
        ),
        ("laughter", r"(?i)^((ha)+h?|(he)+h?|(lo)+l|l+m+a+o+|x+d+|k{3,}|a?ha+)[!.\s]*$"),
        (
            "discourse_marker",
            r"(?i)^(anyway|anyways|whatever|well|so|basically|literally|honestly|actually)[!.?,\s]*$",
        ),
        (
            "bare_question",
            r"(?i)^(what|why|how|who|when|where|wdym|huh|really|srsly|for real|fr|wait what)\s*\?+$",
        ),
        ("url_only", r"^https?://\S+$"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| match Regex::new(pattern) {
        Ok(re) => Some((name, re)),
        Err(e) => {
            tracing::warn!(pattern = name, error = %e, "Invalid pre-filter pattern skipped");
            None
        }
    })
    .collect()
});

/// Classify a raw message.
pub fn classify(text: &str) -> FilterOutcome {
    if is_foreign_command(text) {
        return FilterOutcome::ForeignCommand;
    }
    match trivial_reason(text) {
        Some(reason) => FilterOutcome::Trivial(reason),
        None => FilterOutcome::Pass,
    }
}

pub fn is_trivial(text: &str) -> bool {
    trivial_reason(text).is_some()
}

/// Case-insensitive prefix match against the foreign command list.
///
/// A prefix ending in a letter or digit only matches as a whole word, so
/// "!player stats" is not "!play" but "!play despacito" is.
pub fn is_foreign_command(text: &str) -> bool {
    let lowered = text.trim_start().to_lowercase();
    FOREIGN_COMMAND_PREFIXES.iter().any(|prefix| {
        if !lowered.starts_with(prefix) {
            return false;
        }
        let ends_in_word = prefix
            .chars()
            .last()
            .map(char::is_alphanumeric)
            .unwrap_or(false);
        !ends_in_word
            || lowered[prefix.len()..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true)
    })
}

/// Why `text` is trivial, or `None` when it is worth analysing.
pub fn trivial_reason(text: &str) -> Option<TrivialReason> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();

    if length < PREFILTER_MIN_CHARS {
        return Some(TrivialReason::TooShort);
    }
    if !trimmed.chars().any(char::is_alphanumeric) {
        return Some(TrivialReason::NoAlphanumeric);
    }
    if length > PREFILTER_MAX_TRIVIAL_CHARS {
        return None;
    }

    let normalized = normalize_text(trimmed);
    if FILLER_PHRASES.contains(&normalized.as_str())
        || DISCOURSE_MARKERS.contains(&normalized.as_str())
    {
        return Some(TrivialReason::Filler);
    }

    if let Some((name, _)) = TRIVIAL_PATTERNS.iter().find(|(_, re)| re.is_match(trimmed)) {
        return Some(TrivialReason::Pattern(name));
    }
    if is_repeated_run(trimmed) {
        return Some(TrivialReason::RepeatedCharacters);
    }

    token_rule(&normalized)
}

/// "aaaaaa", "!!!???", "hahahaha" style runs: at most two distinct
/// characters once whitespace is removed.
fn is_repeated_run(text: &str) -> bool {
    let compact: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    if compact.len() < PREFILTER_MIN_CHARS {
        return false;
    }
    let mut distinct: Vec<char> = Vec::with_capacity(3);
    for c in compact {
        if !distinct.contains(&c) {
            distinct.push(c);
            if distinct.len() > 2 {
                return false;
            }
        }
    }
    true
}

fn token_rule(normalized: &str) -> Option<TrivialReason> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    match tokens.len() {
        0 => return Some(TrivialReason::NoAlphanumeric),
        1 => return Some(TrivialReason::SingleToken),
        _ => {}
    }
    if tokens.len() <= PREFILTER_REPEAT_TOKEN_LIMIT && tokens.iter().all(|t| *t == tokens[0]) {
        return Some(TrivialReason::RepeatedTokens);
    }
    if tokens.len() <= PREFILTER_SAFE_TOKEN_LIMIT && tokens.iter().all(|t| SAFE_TOKENS.contains(t))
    {
        return Some(TrivialReason::SafeVocabulary);
    }
    None
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_inputs_trivial() {
        for text in ["", "a", "ok", "lol", "   hi   "] {
            assert!(is_trivial(text), "{:?}", text);
        }
    }

    #[test]
    fn test_punctuation_and_emoji_trivial() {
        assert_eq!(trivial_reason("?!?!?!"), Some(TrivialReason::NoAlphanumeric));
        assert_eq!(trivial_reason("😂😂😂😂"), Some(TrivialReason::NoAlphanumeric));
        assert!(is_trivial("<:pepe:123456789> <a:dance:987654321>"));
        assert!(is_trivial(":thumbsup: :fire:"));
    }

    #[test]
    fn test_patterns() {
        assert_eq!(trivial_reason("12345"), Some(TrivialReason::Pattern("bare_number")));
        assert_eq!(trivial_reason("SMDH!!"), Some(TrivialReason::Pattern("acronym")));
        assert_eq!(trivial_reason("hahahah"), Some(TrivialReason::Pattern("laughter")));
        assert_eq!(trivial_reason("wait what??"), Some(TrivialReason::Pattern("bare_question")));
        assert!(is_trivial("big if true"));
    }

    #[test]
    fn test_repeated_characters() {
        assert_eq!(trivial_reason("aaaa aaa"), Some(TrivialReason::RepeatedCharacters));
    }

    #[test]
    fn test_filler_vocabulary() {
        assert_eq!(trivial_reason("Thank you!"), Some(TrivialReason::Filler));
        assert_eq!(trivial_reason("fair enough"), Some(TrivialReason::Filler));
    }

    #[test]
    fn test_token_rules() {
        assert_eq!(trivial_reason("pineapple"), Some(TrivialReason::SingleToken));
        assert_eq!(trivial_reason("nice nice nice"), Some(TrivialReason::RepeatedTokens));
        assert_eq!(trivial_reason("ok thanks bro"), Some(TrivialReason::SafeVocabulary));
    }

    #[test]
    fn test_claims_pass() {
        assert_eq!(classify("The earth is flat"), FilterOutcome::Pass);
        assert_eq!(classify("vaccines don't work"), FilterOutcome::Pass);
        let long = "word ".repeat(30);
        assert_eq!(classify(&long), FilterOutcome::Pass);
    }

    #[test]
    fn test_foreign_commands() {
        assert!(is_foreign_command("!play never gonna give you up"));
        assert!(is_foreign_command("!PLAY"));
        assert!(is_foreign_command("p!queue"));
        assert!(is_foreign_command("  ;;play lofi"));
        assert!(!is_foreign_command("!player stats are broken"));
        assert!(!is_foreign_command("The earth is flat"));
        assert_eq!(
            classify("!play vaccines don't work"),
            FilterOutcome::ForeignCommand
        );
    }
}
