//! Error types for MarketLens.
//!
//! Library crates use [`MarketLensError`] via `thiserror`. An
//! [`UpstreamError`] from news search is surfaced to the caller; a
//! [`ProviderError`] from the completion capability is absorbed by the
//! summarizer's fallback path. The CLI wraps everything with `color-eyre`.

use std::path::PathBuf;
use std::time::Duration;

/// The news-search collaborator could not answer.
///
/// "Couldn't check for news" is distinct from "no news exists", so the
/// matcher propagates this instead of returning an empty list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// The search did not complete within its time budget.
    #[error("news search timed out after {after:?}")]
    Timeout { after: Duration },

    /// The provider answered with a non-success HTTP status.
    #[error("news search returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, reset...).
    #[error("news search transport error: {0}")]
    Transport(String),

    /// The provider answered 2xx but reported an error in its payload.
    #[error("news provider error [{code}]: {message}")]
    Api { code: String, message: String },

    /// The response body could not be decoded.
    #[error("news search response could not be decoded: {0}")]
    Decode(String),
}

/// The completion capability failed, timed out, or produced unusable output.
///
/// Never surfaced past the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No completion capability is configured.
    #[error("completion provider not configured")]
    NotConfigured,

    #[error("completion timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("completion returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("completion transport error: {0}")]
    Transport(String),

    /// The provider answered, but not with a well-formed summary.
    #[error("malformed completion output: {0}")]
    Malformed(String),
}

/// Top-level error type for MarketLens operations outside the core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MarketLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the market-data provider.
    #[error("network error: {0}")]
    Network(String),

    /// Payload parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input rejected at the boundary (bad bounds, malformed record, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// News search unavailable.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarketLensError>;

impl MarketLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
