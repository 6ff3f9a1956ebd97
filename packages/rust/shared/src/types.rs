//! Core domain types: prediction-market events, news articles, and summaries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MarketLensError, Result};

// ---------------------------------------------------------------------------
// Market / Event
// ---------------------------------------------------------------------------

/// One tradable outcome set within an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MarketRecord")]
pub struct Market {
    pub id: String,
    /// The question this market resolves.
    pub question: String,
    #[serde(default)]
    pub slug: String,
    /// Outcome labels, e.g. `["Yes", "No"]`.
    pub outcomes: Vec<String>,
    /// Prices parallel to `outcomes`, each in `[0, 1]`.
    pub outcome_prices: Vec<f64>,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
}

impl Market {
    /// Build a market, rejecting mismatched outcome/price lengths.
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        outcomes: Vec<String>,
        outcome_prices: Vec<f64>,
    ) -> Result<Self> {
        let id = id.into();
        if outcomes.len() != outcome_prices.len() {
            return Err(MarketLensError::validation(format!(
                "market {id}: {} outcomes but {} prices",
                outcomes.len(),
                outcome_prices.len()
            )));
        }
        Ok(Self {
            id,
            question: question.into(),
            slug: String::new(),
            outcomes,
            outcome_prices,
            volume: 0.0,
            active: true,
            closed: false,
        })
    }

    /// Price of the first outcome (conventionally "Yes").
    pub fn leading_price(&self) -> Option<f64> {
        self.outcome_prices.first().copied()
    }
}

/// Deserialized form of [`Market`], checked through [`Market::new`].
#[derive(Deserialize)]
struct MarketRecord {
    id: String,
    question: String,
    #[serde(default)]
    slug: String,
    outcomes: Vec<String>,
    outcome_prices: Vec<f64>,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    closed: bool,
}

impl TryFrom<MarketRecord> for Market {
    type Error = MarketLensError;

    fn try_from(record: MarketRecord) -> Result<Self> {
        let mut market = Market::new(
            record.id,
            record.question,
            record.outcomes,
            record.outcome_prices,
        )?;
        market.slug = record.slug;
        market.volume = record.volume;
        market.active = record.active;
        market.closed = record.closed;
        Ok(market)
    }
}

/// A prediction-market question with its markets, dates, and metadata.
///
/// Treated as immutable for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Unique, URL-safe identifier.
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Aggregate traded volume across markets.
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
}

impl Event {
    /// Minimal event with just the fields the pipeline reads.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id: slug.clone(),
            slug,
            title: title.into(),
            description: String::new(),
            category: None,
            tags: Vec::new(),
            markets: Vec::new(),
            start_date: None,
            end_date: None,
            volume: 0.0,
            active: true,
            closed: false,
        }
    }

    /// "Yes" price of the first market, if any market carries prices.
    pub fn leading_price(&self) -> Option<f64> {
        self.markets.first().and_then(Market::leading_price)
    }
}

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// Closed date range used to bound a news search. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window; inverted bounds are rejected.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(MarketLensError::validation(format!(
                "time window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Trailing window of `days` ending at `end`, clamped to the earliest
    /// representable instant.
    pub fn trailing(end: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days.max(0))
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Midpoint of the window.
    pub fn center(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Deserialize)]
struct WindowBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = MarketLensError;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        TimeWindow::new(bounds.start, bounds.end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ---------------------------------------------------------------------------
// Article / ScoredArticle
// ---------------------------------------------------------------------------

/// A news item returned by the news-search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Natural key for de-duplication within one result set.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Excerpt of the article body, when the provider returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AsRef<Article> for Article {
    fn as_ref(&self) -> &Article {
        self
    }
}

/// An [`Article`] with its relevance score for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    /// Relevance score, always finite and `>= 0`.
    pub score: f64,
    /// Scoring factors that contributed, e.g. `title_match:2`.
    #[serde(default)]
    pub match_reasons: Vec<String>,
}

impl ScoredArticle {
    /// Ranking order: higher score first, then more recent `published_at`.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.article.published_at.cmp(&self.article.published_at))
    }
}

impl AsRef<Article> for ScoredArticle {
    fn as_ref(&self) -> &Article {
        &self.article
    }
}

// ---------------------------------------------------------------------------
// EventSummary
// ---------------------------------------------------------------------------

/// Overall tone of the coverage for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = MarketLensError;

    /// Accepts the four labels plus market slang (`bullish`, `bearish`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "bullish" => Ok(Self::Positive),
            "negative" | "bearish" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "mixed" => Ok(Self::Mixed),
            other => Err(MarketLensError::parse(format!("unknown sentiment: {other}"))),
        }
    }
}

/// Which summarization path produced an [`EventSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Written by the completion provider.
    Generative { model: String },
    /// Deterministic headline digest.
    Fallback,
}

impl Provenance {
    pub fn is_generative(&self) -> bool {
        matches!(self, Self::Generative { .. })
    }
}

/// Short synopsis of the news around one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SummaryRecord")]
pub struct EventSummary {
    pub summary: String,
    /// Never empty.
    pub key_points: Vec<String>,
    pub sentiment: Sentiment,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    /// Number of articles the summary was built from.
    pub sources_used: usize,
    pub provenance: Provenance,
}

impl EventSummary {
    /// Build a summary, rejecting anything a caller must never see: blank
    /// text, no key points, or confidence outside `[0, 1]`.
    pub fn new(
        summary: impl Into<String>,
        key_points: Vec<String>,
        sentiment: Sentiment,
        confidence: f64,
        sources_used: usize,
        provenance: Provenance,
    ) -> Result<Self> {
        let summary = summary.into().trim().to_string();
        if summary.is_empty() {
            return Err(MarketLensError::validation("summary text is empty"));
        }
        if key_points.is_empty() {
            return Err(MarketLensError::validation("summary has no key points"));
        }
        if key_points.iter().any(|p| p.trim().is_empty()) {
            return Err(MarketLensError::validation("summary has a blank key point"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MarketLensError::validation(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            summary,
            key_points,
            sentiment,
            confidence,
            sources_used,
            provenance,
        })
    }
}

/// Deserialized form of [`EventSummary`], checked through [`EventSummary::new`].
#[derive(Deserialize)]
struct SummaryRecord {
    summary: String,
    key_points: Vec<String>,
    sentiment: Sentiment,
    confidence: f64,
    #[serde(default)]
    sources_used: usize,
    provenance: Provenance,
}

impl TryFrom<SummaryRecord> for EventSummary {
    type Error = MarketLensError;

    fn try_from(record: SummaryRecord) -> Result<Self> {
        EventSummary::new(
            record.summary,
            record.key_points,
            record.sentiment,
            record.confidence,
            record.sources_used,
            record.provenance,
        )
    }
}
