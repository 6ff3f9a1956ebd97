//! Capability traits for the pipeline's injected collaborators.
//!
//! The core never constructs a client itself: the news-search and completion
//! capabilities are passed in as trait objects, so tests can substitute
//! deterministic implementations and the CLI can plug in HTTP clients.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProviderError, UpstreamError};
use crate::types::{Article, TimeWindow};

/// Searches a news provider for articles matching a query within a window.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Return zero or more articles. An empty result is a valid answer;
    /// failures to reach the provider are reported as [`UpstreamError`].
    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
    ) -> std::result::Result<Vec<Article>, UpstreamError>;
}

/// System + user message pair sent to a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Bounds for a single completion attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionBudget {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for CompletionBudget {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Generates text from a prompt. One call is one attempt; implementations
/// must not retry.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        budget: &CompletionBudget,
    ) -> std::result::Result<String, ProviderError>;

    /// Model identifier recorded in the summary's provenance.
    fn model(&self) -> &str;
}
