//! End-to-end brief for one event: query → search → score → summarize.
//!
//! Steps run strictly in sequence and nothing is spawned, so dropping the
//! returned future cancels any in-flight network call.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument};

use marketlens_shared::{Event, EventSummary, ScoredArticle, TimeWindow, UpstreamError};

use crate::matcher::{MatchOptions, Matcher};
use crate::summarizer::Summarizer;

/// Result of briefing one event.
#[derive(Debug, Clone, Serialize)]
pub struct EventBrief {
    pub slug: String,
    pub title: String,
    /// Query string sent to the news search.
    pub query: String,
    pub window: TimeWindow,
    /// Ranked articles, best first.
    pub articles: Vec<ScoredArticle>,
    pub summary: EventSummary,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once matching has finished.
    fn matched(&self, candidates: usize, kept: usize);
    /// Called when the brief is ready.
    fn done(&self, brief: &EventBrief);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn matched(&self, _candidates: usize, _kept: usize) {}
    fn done(&self, _brief: &EventBrief) {}
}

/// Match and summarize `event`.
///
/// A news search failure is returned as-is; summarization never fails.
pub async fn brief_event(
    event: &Event,
    matcher: &Matcher<'_>,
    summarizer: &Summarizer<'_>,
    opts: &MatchOptions,
) -> Result<EventBrief, UpstreamError> {
    brief_event_with_progress(event, matcher, summarizer, opts, &SilentProgress).await
}

/// Like [`brief_event`], reporting each phase to `progress`.
#[instrument(skip_all, fields(slug = %event.slug))]
pub async fn brief_event_with_progress(
    event: &Event,
    matcher: &Matcher<'_>,
    summarizer: &Summarizer<'_>,
    opts: &MatchOptions,
    progress: &dyn ProgressReporter,
) -> Result<EventBrief, UpstreamError> {
    let start = Instant::now();

    progress.phase("Searching news");
    let outcome = matcher.match_event_detailed(event, opts).await?;
    progress.matched(outcome.candidates, outcome.articles.len());

    progress.phase("Summarizing");
    let summary = summarizer.summarize(event, &outcome.articles).await;

    let brief = EventBrief {
        slug: event.slug.clone(),
        title: event.title.clone(),
        query: outcome.query,
        window: outcome.window,
        articles: outcome.articles,
        summary,
        elapsed: start.elapsed(),
    };

    info!(
        articles = brief.articles.len(),
        generative = brief.summary.provenance.is_generative(),
        elapsed_ms = brief.elapsed.as_millis() as u64,
        "brief complete"
    );
    progress.done(&brief);
    Ok(brief)
}
