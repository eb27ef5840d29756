//! Locating quoted evidence in the author's actual history.

use crate::constants::MIN_FUZZY_MATCH_CHARS;
use veritas_core::{normalize_text, MessageRecord};

/// Find the history message a model quotation refers to.
///
/// `window` is oldest-first. Normalized exact matches win; otherwise a
/// substring match in either direction is accepted when the contained side
/// is at least `MIN_FUZZY_MATCH_CHARS` long. Within each pass the newest
/// message wins.
pub fn locate_evidence<'a>(quote: &str, window: &'a [MessageRecord]) -> Option<&'a MessageRecord> {
    let needle = normalize_text(quote.trim().trim_matches(|c| c == '"' || c == '\''));
    if needle.is_empty() {
        return None;
    }

    let normalized: Vec<(String, &MessageRecord)> = window
        .iter()
        .rev()
        .map(|m| (normalize_text(&m.content), m))
        .collect();

    if let Some((_, record)) = normalized.iter().find(|(text, _)| *text == needle) {
        return Some(*record);
    }

    normalized
        .iter()
        .find(|(text, _)| {
            if text.is_empty() {
                return false;
            }
            let (longer, shorter) = if text.len() >= needle.len() {
                (text.as_str(), needle.as_str())
            } else {
                (needle.as_str(), text.as_str())
            };
            shorter.chars().count() >= MIN_FUZZY_MATCH_CHARS && longer.contains(shorter)
        })
        .map(|(_, record)| *record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_test_utils::MessageBuilder;

    fn window(contents: &[&str]) -> Vec<MessageRecord> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| MessageBuilder::new(i as u64 + 1).content(*c).build())
            .collect()
    }

    #[test]
    fn test_exact_match_after_normalization() {
        let history = window(&["The earth is flat!", "I like cats"]);
        let found = locate_evidence("\"the earth is flat\"", &history).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn test_fuzzy_match_either_direction() {
        let history = window(&["Honestly the earth is flat and always was"]);
        assert!(locate_evidence("the earth is flat", &history).is_some());

        let history = window(&["earth is flat"]);
        assert!(locate_evidence("I said earth is flat yesterday", &history).is_some());
    }

    #[test]
    fn test_short_fragments_rejected() {
        let history = window(&["the earth is flat"]);
        assert!(locate_evidence("flat", &history).is_none());
    }

    #[test]
    fn test_unmatched_quote_rejected() {
        let history = window(&["I like cats", "Dogs are fine"]);
        assert!(locate_evidence("The earth is flat", &history).is_none());
        assert!(locate_evidence("   ", &history).is_none());
    }

    #[test]
    fn test_newest_match_wins() {
        let history = window(&["the earth is flat", "something else", "the earth is flat"]);
        assert_eq!(locate_evidence("the earth is flat", &history).unwrap().id, 3);
    }

    #[test]
    fn test_exact_preferred_over_newer_fuzzy() {
        let history = window(&["the earth is flat", "the earth is flat and nasa lies"]);
        assert_eq!(locate_evidence("the earth is flat", &history).unwrap().id, 1);
    }
}
