//! Property tests for the detection heuristics and their cached wrappers.

use std::sync::Arc;

use proptest::prelude::*;
use veritas_core::PipelineConfig;
use veritas_engine::detect::{analyze, is_trivial, validate, ValidationRule};
use veritas_engine::{PipelineContext, Upstreams};
use veritas_storage::InMemoryMessageStore;
use veritas_test_utils::generators::{arb_chat_text, arb_sentence};
use veritas_test_utils::{ScriptedGeneration, StaticWebAnswer};

fn context() -> PipelineContext {
    PipelineContext::new(
        PipelineConfig::default(),
        Arc::new(InMemoryMessageStore::new()),
        Upstreams {
            generation: Arc::new(ScriptedGeneration::new(Vec::<String>::new())),
            web_answer: Arc::new(StaticWebAnswer::empty()),
            web_search: None,
        },
    )
}

fn arb_claim_words() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec![
            "the", "earth", "is", "flat", "round", "vaccines", "are", "safe", "people", "water",
            "wet", "moon", "landing", "real", "climate", "warming",
        ]),
        1..10,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Long messages with any letters in them are always analysed.
    #[test]
    fn prop_long_messages_never_trivial(s in "[a-z][a-z ]{100,180}[a-z]") {
        prop_assert!(!is_trivial(&s));
    }

    /// Inserting a negator into a statement always counts as opposing it.
    #[test]
    fn prop_negated_restatement_allowed(words in arb_claim_words()) {
        let statement = words.join(" ");
        let mut negated = words.clone();
        negated.insert(1.min(negated.len()), "not");
        let negated = negated.join(" ");

        prop_assert!(validate(&statement, &negated));
        prop_assert_eq!(
            veritas_engine::detect::evaluate(&statement, &negated),
            ValidationRule::OpposingClaims
        );
    }

    /// The cached analysis always agrees with a fresh one, hit or miss.
    #[test]
    fn prop_cached_analysis_matches_fresh(text in arb_chat_text()) {
        let ctx = context();
        let fresh = analyze(&text);
        prop_assert_eq!(ctx.analyze(&text), fresh);
        prop_assert_eq!(ctx.analyze(&text), fresh);
    }

    /// The cached validation always agrees with the bare validator.
    #[test]
    fn prop_cached_validation_matches_fresh(a in arb_sentence(), b in arb_sentence()) {
        let ctx = context();
        let fresh = validate(&a, &b);
        prop_assert_eq!(ctx.validate(&a, &b), fresh);
        prop_assert_eq!(ctx.validate(&a, &b), fresh);
    }
}
