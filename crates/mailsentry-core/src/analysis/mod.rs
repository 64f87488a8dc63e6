//! Staged review-analysis workflow.
//!
//! A fixed, strictly sequential pipeline: preprocess, classify sentiment,
//! extract problems, extract suggestions, summarize, determine priority,
//! extract customer name, decide response-required. Every stage catches its
//! own failure and substitutes a documented safe default — one stage's
//! failure never blocks the rest.

mod llm;
mod prompts;
mod stages;
mod state;
mod workflow;

pub use llm::{CompletionClient, CompletionError, MistralClient, first_json_object};
pub use state::{AnalysisState, StageOutcome};
pub use workflow::{Analyzer, ReviewAnalysis};
