//! Word lists shared by the pre-filter, analyzer and validator.
//!
//! All entries are lowercase and compared against `normalize_text` output.

/// Whole messages that carry no claim (acknowledgements, greetings, filler).
pub const FILLER_PHRASES: &[&str] = &[
    "ok", "okay", "k", "kk", "yes", "yeah", "yep", "yup", "ya", "ye", "no", "nope", "nah",
    "sure", "true", "fr", "frfr", "same", "mood", "based", "facts", "real", "bet", "word",
    "thanks", "thank you", "thx", "ty", "tysm", "np", "no problem", "yw", "you're welcome",
    "hi", "hey", "hello", "yo", "sup", "gm", "gn", "good morning", "good night", "bye", "cya",
    "see ya", "brb", "gtg", "afk", "lol", "lmao", "lmfao", "rofl", "haha", "hehe", "xd",
    "omg", "wow", "nice", "cool", "neat", "damn", "dang", "bruh", "bro", "wtf", "idk", "idc",
    "ikr", "smh", "tbh", "imo", "imho", "ngl", "rip", "gg", "ggs", "wp", "pog", "poggers",
    "oof", "yikes", "huh", "what", "why", "how", "when", "where", "who", "hmm", "hm", "ah",
    "oh", "uh", "um", "meh", "welp", "agreed", "exactly", "right", "indeed", "fair",
    "fair enough", "makes sense", "i see", "got it", "i agree", "me too", "same here",
    "of course", "sounds good", "good point", "lets go", "let's go", "ez", "f", "w", "l",
    "ratio", "cope", "sheesh", "slay", "period", "bussin", "no cap", "cap", "deadass",
];

/// Tokens that are individually safe: several of them in a row still make
/// a trivial message ("ok thanks bro").
pub const SAFE_TOKENS: &[&str] = &[
    "ok", "okay", "k", "yes", "yeah", "yep", "yup", "no", "nope", "nah", "sure", "thanks",
    "thank", "you", "thx", "ty", "lol", "lmao", "haha", "hehe", "xd", "omg", "wow", "nice",
    "cool", "bro", "bruh", "dude", "man", "fr", "same", "true", "facts", "real", "hi", "hey",
    "hello", "yo", "bye", "gg", "gn", "gm", "idk", "ikr", "tbh", "ngl", "imo", "oh", "ah",
    "uh", "um", "hmm", "so", "well", "like", "just", "very", "really", "good", "great",
    "lit", "based", "w", "l", "rip", "oof", "damn", "dang", "sheesh", "please", "pls", "plz",
    "too", "me", "i", "a", "the", "and", "that", "this", "it", "is", "was", "lets", "let's",
    "go", "agreed", "exactly", "right",
];

/// Discourse markers that, on their own, never make a claim.
pub const DISCOURSE_MARKERS: &[&str] = &[
    "anyway", "anyways", "whatever", "well", "so", "basically", "literally", "honestly",
    "actually", "apparently", "like", "yeah no", "no yeah",
];

/// Markers of a hedged, non-committal statement.
pub const UNCERTAINTY_MARKERS: &[&str] = &[
    "maybe", "perhaps", "possibly", "probably", "might", "may be", "could be", "i think",
    "i guess", "i believe", "i feel like", "not sure", "unsure", "idk", "i don't know",
    "seems like", "it seems", "kinda", "sort of", "kind of", "allegedly", "supposedly",
    "who knows",
];

/// Markers that a statement is bounded in time ("used to", "back then").
pub const TEMPORAL_MARKERS: &[&str] = &[
    "used to", "anymore", "no longer", "back then", "previously", "formerly", "at first",
    "nowadays", "these days", "currently", "recently", "lately", "last year", "this year",
    "changed my mind", "i was wrong", "not anymore", "since then",
];

/// Words that make a statement absolute.
pub const ABSOLUTE_MARKERS: &[&str] = &[
    "always", "never", "all", "every", "everyone", "everybody", "nobody", "none", "nothing",
    "everything", "completely", "totally", "absolutely", "definitely", "certainly",
    "guaranteed", "entirely", "impossible", "undeniable", "proven",
];

/// Words that cite a source or evidence.
pub const EVIDENCE_MARKERS: &[&str] = &[
    "study", "studies", "research", "according to", "source", "sources", "data",
    "statistics", "evidence", "scientists", "experts", "paper", "journal", "report",
    "survey", "percent", "published", "peer reviewed", "cdc", "fda", "nih",
];

/// Negating tokens.
pub const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
    "weren't", "won't", "wouldn't", "can't", "cannot", "couldn't", "shouldn't", "nothing",
    "nobody", "none", "neither", "nor", "dont", "doesnt", "isnt", "arent", "wasnt", "cant",
];

/// Topic clusters. Two messages whose clusters are both non-empty and
/// disjoint are about different things.
pub const TOPIC_CLUSTERS: &[(&str, &[&str])] = &[
    (
        "health",
        &[
            "vaccine", "vaccines", "vaccinated", "vaccination", "vax", "covid", "virus",
            "disease", "cancer", "cure", "cures", "medicine", "drug", "drugs", "doctor",
            "doctors", "health", "autism", "pandemic", "mask", "masks", "ivermectin",
        ],
    ),
    (
        "earth_space",
        &[
            "earth", "planet", "globe", "moon", "sun", "space", "nasa", "flat", "round",
            "sphere", "spherical", "orbit", "gravity", "landing",
        ],
    ),
    (
        "climate",
        &[
            "climate", "warming", "carbon", "co2", "emissions", "weather", "temperature",
            "greenhouse", "fossil",
        ],
    ),
    (
        "politics",
        &[
            "election", "elections", "vote", "votes", "voting", "ballot", "ballots", "fraud",
            "president", "government", "democrat", "democrats", "republican", "republicans",
            "congress", "senate", "rigged",
        ],
    ),
    (
        "science",
        &[
            "evolution", "science", "scientist", "scientists", "theory", "physics",
            "chemistry", "biology", "dinosaurs", "atoms", "dna",
        ],
    ),
    (
        "economy",
        &[
            "economy", "inflation", "recession", "stocks", "stock", "market", "crypto",
            "bitcoin", "taxes", "tax", "prices", "dollar", "wages",
        ],
    ),
];

/// Agreement clusters: two messages landing in the same non-empty set of
/// these are saying the same thing in different words.
pub const AGREEMENT_CLUSTERS: &[(&str, &[&str])] = &[
    ("flat", &["flat", "pancake", "disc", "plane"]),
    ("round", &["round", "spherical", "globe", "sphere", "oblate", "ball"]),
    ("safe", &["safe", "harmless", "fine"]),
    ("dangerous", &["dangerous", "unsafe", "harmful", "deadly", "toxic"]),
    ("fake", &["fake", "hoax", "staged", "scam", "lie"]),
];

/// Assertion/negation pairs. A pair of messages contradicts when one side
/// holds the positive form and the other the negative form.
pub const OPPOSING_PAIRS: &[(&[&str], &[&str])] = &[
    (&["safe"], &["dangerous", "unsafe", "harmful", "not safe"]),
    (&["true"], &["false", "not true", "untrue"]),
    (
        &["work", "works", "effective"],
        &["don't work", "doesn't work", "do not work", "does not work", "ineffective", "useless"],
    ),
    (&["real"], &["fake", "hoax", "not real"]),
    (&["exists", "exist"], &["doesn't exist", "don't exist", "does not exist", "not exist"]),
    (&["always"], &["never"]),
    (&["increase", "increases", "rising"], &["decrease", "decreases", "falling"]),
];

/// Exact normalized-token match against a word list.
pub fn contains_token(tokens: &[&str], list: &[&str]) -> bool {
    tokens.iter().any(|t| list.contains(t))
}

/// Phrase match on normalized text, respecting word boundaries.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let padded = format!(" {} ", normalized);
    padded.contains(&format!(" {} ", phrase))
}

/// Whether any entry of `list` occurs in `normalized`.
pub fn contains_any(normalized: &str, list: &[&str]) -> bool {
    list.iter().any(|p| contains_phrase(normalized, p))
}

/// Names of the clusters in `clusters` that the normalized text touches.
pub fn clusters_of(normalized: &str, clusters: &[(&'static str, &[&str])]) -> Vec<&'static str> {
    clusters
        .iter()
        .filter(|(_, words)| contains_any(normalized, words))
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_respects_word_boundaries() {
        assert!(contains_phrase("the earth is round", "round"));
        assert!(!contains_phrase("the earth is around", "round"));
        assert!(contains_phrase("vaccines don't work", "don't work"));
    }

    #[test]
    fn test_topic_clusters() {
        assert_eq!(clusters_of("the earth is flat", TOPIC_CLUSTERS), vec!["earth_space"]);
        assert!(clusters_of("i like pizza", TOPIC_CLUSTERS).is_empty());
    }

    #[test]
    fn test_lists_are_lowercase() {
        for list in [FILLER_PHRASES, SAFE_TOKENS, UNCERTAINTY_MARKERS, TEMPORAL_MARKERS] {
            for entry in list {
                assert_eq!(*entry, entry.to_lowercase());
            }
        }
    }
}
