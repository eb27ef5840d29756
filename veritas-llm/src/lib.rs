//! VERITAS LLM - Upstream Providers
//!
//! HTTP implementations of the service traits defined in veritas-core
//! (`GenerationService`, `WebAnswerService`, `WebSearchService`) and the one
//! routine every caller uses to pull a structured verdict out of free-form
//! model output.
//!
//! Nothing here knows about breakers or admission gates; the engine wraps
//! every provider before use.

pub mod providers;
pub mod verdict;

pub use providers::{
    BraveSearchProvider, OpenAIClient, OpenAIGenerationProvider, PerplexityAnswerProvider,
};
pub use verdict::{deserialize_loose_verdict, extract_structured_block, parse_verdict, ParsedVerdict};
