//! Core matching and summarization logic for MarketLens.
//!
//! This crate turns a prediction-market [`Event`](marketlens_shared::Event)
//! into a ranked set of news articles and a short summary. Network access is
//! injected through the capability traits in `marketlens-shared`.

pub mod matcher;
pub mod pipeline;
mod prompt;
pub mod query;
pub mod scoring;
pub mod summarizer;
mod text;

pub use matcher::{MatchOptions, MatchOutcome, Matcher};
pub use pipeline::{
    EventBrief, ProgressReporter, SilentProgress, brief_event, brief_event_with_progress,
};
pub use prompt::{HIGH_CONFIDENCE, LOW_CONFIDENCE, MEDIUM_CONFIDENCE};
pub use query::{QueryBuilder, QueryTerm, TermKind};
pub use scoring::RelevanceScorer;
pub use summarizer::{FallbackReason, Summarizer, SummarizerConfig, SummaryOutcome};
