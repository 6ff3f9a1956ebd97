//! NewsAPI response payloads and their conversion into [`Article`]s.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use marketlens_shared::Article;

/// Placeholder NewsAPI substitutes for withdrawn articles.
const REMOVED: &str = "[Removed]";

/// Truncation marker NewsAPI appends to `content`, e.g. `"... [+2817 chars]"`.
static TRUNCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[\+\d+ chars\]\s*$").expect("valid regex"));

/// Envelope shared by `/everything` and `/top-headlines`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<WireArticle>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireArticle {
    #[serde(default)]
    pub source: WireSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl WireArticle {
    /// Convert to an [`Article`], or `None` for withdrawn, undated, or
    /// URL-less entries.
    pub fn into_article(self) -> Option<Article> {
        let title = self.title.unwrap_or_default();
        if title.trim() == REMOVED {
            return None;
        }
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        let published_at = match self.published_at.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(at)) => at.with_timezone(&Utc),
            _ => {
                debug!(%url, "skipping article without a valid publishedAt");
                return None;
            }
        };

        Some(Article {
            source_name: self
                .source
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            author: non_empty(self.author),
            title,
            description: non_empty(self.description),
            url,
            image_url: non_empty(self.url_to_image),
            published_at,
            content: non_empty(self.content.map(|c| strip_truncation(&c))),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn strip_truncation(content: &str) -> String {
    TRUNCATION_RE.replace(content, "").into_owned()
}
