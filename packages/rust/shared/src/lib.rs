//! Shared types, error model, configuration, and capability traits for MarketLens.
//!
//! This crate is the foundation depended on by all other MarketLens crates.
//! It provides:
//! - [`MarketLensError`], [`UpstreamError`], [`ProviderError`]: the error taxonomy
//! - Domain types ([`Event`], [`Market`], [`Article`], [`ScoredArticle`], [`EventSummary`])
//! - Capability traits ([`NewsSearch`], [`Completion`]) implemented by provider crates
//! - Configuration ([`AppConfig`], config loading)

pub mod capability;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use capability::{Completion, CompletionBudget, NewsSearch, Prompt};
pub use config::{
    AppConfig, DEFAULT_FALLBACK_CONFIDENCE, DefaultsConfig, GammaSection, MAX_ARTICLES_RANGE,
    MAX_WINDOW_DAYS, NewsApiSection, OpenAiSection, QueryConfig, ScoringWeights,
    SummarizerSection, api_key_from_env, config_dir, config_file_path, init_config,
    init_config_at, load_config, load_config_from, require_api_key,
};
pub use error::{MarketLensError, ProviderError, Result, UpstreamError};
pub use types::{
    Article, Event, EventSummary, Market, Provenance, ScoredArticle, Sentiment, TimeWindow,
};
