//! Prompt templates for the generation service.

use veritas_core::{MessageRecord, SearchResult, WebAnswer};

pub const CONTRADICTION_SYSTEM: &str = "You check whether a chat user contradicts their own \
earlier statements. Only flag direct logical contradictions of a factual claim, not changes \
of topic, jokes, hedged opinions or positions the user explicitly says have changed. \
Respond with a single JSON object and nothing else.";

pub const MISINFORMATION_SYSTEM: &str = "You are a careful fact checker. Using only the \
provided web evidence, decide whether a chat message states critical misinformation: a \
factual claim that is clearly false and potentially harmful. Opinions, jokes, predictions \
and unverifiable claims are not misinformation. Respond with a single JSON object and \
nothing else.";

pub const SUMMARY_SYSTEM: &str = "You summarize chat conversations. Write a short neutral \
summary of the main topics and any conclusions, in at most five sentences. Do not quote \
users by name.";

pub const REPLY_SYSTEM: &str = "You are a concise, friendly assistant in a chat server. \
Answer the question in at most four sentences. When web context is provided, prefer it \
and do not invent sources.";

/// Prompt asking whether `current` contradicts a statement in `window`
/// (oldest first).
pub fn contradiction_prompt(window: &[MessageRecord], current: &str) -> String {
    let history = window
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {}", i + 1, m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Earlier statements by this user, oldest first:\n{history}\n\n\
         New message:\n{current}\n\n\
         Does the new message directly contradict one of the earlier statements?\n\
         Answer with JSON: {{\"contradiction\": \"yes\" or \"no\", \"reason\": \"one sentence\", \
         \"evidence\": \"the earlier statement, quoted exactly\"}}",
        history = history,
        current = current.trim(),
    )
}

/// Prompt asking whether `message` is misinformation given the grounding.
pub fn misinformation_prompt(message: &str, answer: &WebAnswer, results: &[SearchResult]) -> String {
    let mut evidence = format!("Web answer:\n{}\n", answer.answer_text.trim());
    if !answer.cited_urls.is_empty() {
        evidence.push_str("\nSources:\n");
        for url in &answer.cited_urls {
            evidence.push_str("- ");
            evidence.push_str(url);
            evidence.push('\n');
        }
    }
    if !results.is_empty() {
        evidence.push_str("\nSearch results:\n");
        for r in results {
            evidence.push_str(&format!("- {} ({}): {}\n", r.title, r.url, r.snippet));
        }
    }

    format!(
        "Message:\n{message}\n\n{evidence}\n\
         Is the message critical misinformation according to this evidence?\n\
         Answer with JSON: {{\"misinformation\": \"yes\" or \"no\", \"reason\": \"one sentence\", \
         \"evidence\": \"the fact that refutes it\", \"url\": \"best source url or empty\"}}",
        message = message.trim(),
        evidence = evidence,
    )
}

/// Query sent to the web-answer service for a message under fact-check.
pub fn fact_check_query(message: &str) -> String {
    format!("Is the following claim accurate? {}", message.trim())
}

/// Prompt summarizing `messages` (oldest first).
pub fn summary_prompt(messages: &[MessageRecord]) -> String {
    let transcript = messages
        .iter()
        .map(|m| format!("[{}] {}", m.created_at.format("%H:%M"), m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Conversation:\n{}\n\nSummary:", transcript)
}

/// Prompt answering `question`, with web grounding when available.
pub fn reply_prompt(question: &str, grounding: Option<&WebAnswer>) -> String {
    match grounding {
        Some(answer) => format!(
            "Web context:\n{}\n\nQuestion: {}",
            answer.answer_text.trim(),
            question.trim()
        ),
        None => format!("Question: {}", question.trim()),
    }
}
