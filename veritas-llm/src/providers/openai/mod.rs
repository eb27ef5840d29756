//! OpenAI-compatible provider
//!
//! Chat completions against any OpenAI-compatible endpoint (OpenAI,
//! OpenRouter, local gateways), with ordered model fallback.

pub mod client;
pub mod generation;
pub mod types;

pub use client::OpenAIClient;
pub use generation::OpenAIGenerationProvider;
