//! Detection: pre-filter, content analyzer, contradiction validator and the
//! two-track orchestrator that combines them with the upstream services.

pub mod analyzer;
pub mod evidence;
pub mod orchestrator;
pub mod prefilter;
pub mod prompts;
pub mod validator;
pub mod vocab;

pub use analyzer::{analyze, ContentAnalysis};
pub use evidence::locate_evidence;
pub use orchestrator::{ContradictionVerdict, DetectionOrchestrator, MisinformationVerdict};
pub use prefilter::{classify, is_foreign_command, is_trivial, FilterOutcome, TrivialReason};
pub use validator::{evaluate, validate, ValidationRule};
