//! Structured verdict extraction
//!
//! Models are asked for a JSON object but answer in free text: code fences,
//! a sentence of preamble, trailing commentary. `extract_structured_block`
//! finds the first balanced `{...}` that parses as a JSON object;
//! `parse_verdict` maps it onto a typed verdict or an explicit
//! `Unparseable` variant. Unparseable output is a negative verdict for the
//! caller, never an error.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use veritas_core::Verdict;

/// Result of parsing model output into a typed verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedVerdict<T> {
    Parsed(T),
    Unparseable { reason: String },
}

impl<T> ParsedVerdict<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparseable { .. } => None,
        }
    }
}

/// Find the first balanced `{...}` block in `text` that is a JSON object.
///
/// Braces inside JSON strings (including escaped quotes) do not count
/// toward balance. Candidates that are balanced but not valid JSON are
/// skipped and the scan resumes at the next opening brace.
pub fn extract_structured_block(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            let candidate = &text[open..=close];
            if let Ok(serde_json::Value::Object(_)) = serde_json::from_str(candidate) {
                return Some(candidate);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the `}` closing the `{` at `open`, if the block is balanced.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract and deserialize the first structured block in `text`.
pub fn parse_verdict<T: DeserializeOwned>(text: &str) -> ParsedVerdict<T> {
    let Some(block) = extract_structured_block(text) else {
        return ParsedVerdict::Unparseable {
            reason: "no structured block found".to_string(),
        };
    };

    match serde_json::from_str::<T>(block) {
        Ok(value) => ParsedVerdict::Parsed(value),
        Err(e) => ParsedVerdict::Unparseable {
            reason: format!("structured block did not match schema: {}", e),
        },
    }
}

/// Serde helper accepting `"yes"`, `"no"`, `true`, `false` or any other
/// string (negative) for a verdict field.
pub fn deserialize_loose_verdict<'de, D>(deserializer: D) -> Result<Verdict, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Bool(bool),
        Text(String),
    }

    match Loose::deserialize(deserializer) {
        Ok(Loose::Bool(true)) => Ok(Verdict::Yes),
        Ok(Loose::Bool(false)) => Ok(Verdict::No),
        Ok(Loose::Text(s)) => Ok(Verdict::from_loose(&s)),
        Err(_) => Err(de::Error::custom("verdict must be a string or boolean")),
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        #[serde(deserialize_with = "deserialize_loose_verdict")]
        contradiction: Verdict,
        #[serde(default)]
        evidence: String,
    }

    #[test]
    fn test_extract_plain_object() {
        let text = r#"{"contradiction": "yes", "evidence": "x"}"#;
        assert_eq!(extract_structured_block(text), Some(text));
    }

    #[test]
    fn test_extract_from_code_fence_and_prose() {
        let text = "Sure! Here is my answer:\n```json\n{\"contradiction\": \"no\"}\n```\nHope that helps.";
        assert_eq!(
            extract_structured_block(text),
            Some("{\"contradiction\": \"no\"}")
        );
    }

    #[test]
    fn test_extract_ignores_braces_inside_strings() {
        let text = r#"{"reason": "they said \"{not json}\" earlier", "contradiction": "yes"}"#;
        assert_eq!(extract_structured_block(text), Some(text));
    }

    #[test]
    fn test_extract_skips_invalid_candidate() {
        let text = r#"The set {a, b} differs. {"contradiction": "yes"}"#;
        assert_eq!(
            extract_structured_block(text),
            Some(r#"{"contradiction": "yes"}"#)
        );
    }

    #[test]
    fn test_extract_unbalanced_returns_none() {
        assert_eq!(extract_structured_block(r#"{"contradiction": "yes""#), None);
        assert_eq!(extract_structured_block("no braces at all"), None);
        assert_eq!(extract_structured_block(""), None);
    }

    #[test]
    fn test_extract_nested_object() {
        let text = r#"prefix {"a": {"b": 1}, "c": 2} suffix"#;
        assert_eq!(
            extract_structured_block(text),
            Some(r#"{"a": {"b": 1}, "c": 2}"#)
        );
    }

    #[test]
    fn test_parse_verdict_lenient_values() {
        let parsed: ParsedVerdict<Sample> =
            parse_verdict(r#"{"contradiction": true, "evidence": "The earth is flat"}"#);
        assert_eq!(
            parsed,
            ParsedVerdict::Parsed(Sample {
                contradiction: Verdict::Yes,
                evidence: "The earth is flat".to_string(),
            })
        );

        let parsed: ParsedVerdict<Sample> = parse_verdict(r#"{"contradiction": "maybe"}"#);
        assert_eq!(
            parsed.into_option().map(|s| s.contradiction),
            Some(Verdict::No)
        );
    }

    #[test]
    fn test_parse_verdict_unparseable_variants() {
        let missing: ParsedVerdict<Sample> = parse_verdict("I cannot answer that.");
        assert!(!missing.is_parsed());

        let wrong_shape: ParsedVerdict<Sample> = parse_verdict(r#"{"verdict": "yes"}"#);
        match wrong_shape {
            ParsedVerdict::Unparseable { reason } => assert!(reason.contains("schema")),
            ParsedVerdict::Parsed(_) => panic!("expected unparseable"),
        }

        let wrong_type: ParsedVerdict<Sample> = parse_verdict(r#"{"contradiction": 1}"#);
        assert!(!wrong_type.is_parsed());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
