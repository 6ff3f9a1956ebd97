//! Cross-crate test of the full brief for the Fed rate decision example.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use marketlens_core::{
    MatchOptions, Matcher, QueryBuilder, Summarizer, SummarizerConfig, brief_event,
};
use marketlens_shared::{
    Article, DEFAULT_FALLBACK_CONFIDENCE, Event, NewsSearch, Provenance, ScoringWeights, Sentiment,
    TimeWindow, UpstreamError,
};

const FED_ARTICLES: &str = include_str!("../../../../fixtures/json/fed_articles.json");

/// Serves the fixture articles that fall inside the requested window.
struct FixtureSearch {
    articles: Vec<Article>,
}

#[async_trait]
impl NewsSearch for FixtureSearch {
    async fn search(
        &self,
        _query: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Article>, UpstreamError> {
        Ok(self
            .articles
            .iter()
            .filter(|a| window.contains(a.published_at))
            .cloned()
            .collect())
    }
}

fn fed_event() -> Event {
    let mut event = Event::new("fed-rate-decision-december", "Fed rate decision December");
    event.tags = vec!["fed".into(), "rates".into()];
    event.start_date = Some(Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap());
    event.end_date = Some(Utc.with_ymd_and_hms(2025, 12, 4, 0, 0, 0).unwrap());
    event
}

#[tokio::test]
async fn fed_rate_decision_brief() {
    let articles: Vec<Article> = serde_json::from_str(FED_ARTICLES).unwrap();
    assert_eq!(articles.len(), 7);
    let search = FixtureSearch { articles };

    let event = fed_event();
    let matcher = Matcher::new(&search, QueryBuilder::default(), ScoringWeights::default());
    let summarizer = Summarizer::fallback_only(SummarizerConfig::default());
    let opts = MatchOptions::new(5).unwrap();

    let brief = brief_event(&event, &matcher, &summarizer, &opts).await.unwrap();

    for term in ["Fed", "rate", "December"] {
        assert!(brief.query.contains(term), "{term} missing from {}", brief.query);
    }
    assert_eq!(
        brief.window.start(),
        Utc.with_ymd_and_hms(2025, 10, 4, 0, 0, 0).unwrap()
    );
    assert_eq!(
        brief.window.end(),
        Utc.with_ymd_and_hms(2025, 12, 4, 0, 0, 0).unwrap()
    );

    assert_eq!(brief.articles.len(), 5);
    for pair in brief.articles.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let urls: Vec<&str> = brief.articles.iter().map(|s| s.article.url.as_str()).collect();
    assert!(!urls.contains(&"https://news.example.com/championship"));
    assert!(!urls.contains(&"https://news.example.com/phone-launch"));

    let summary = &brief.summary;
    assert_eq!(summary.sentiment, Sentiment::Neutral);
    assert_eq!(summary.confidence, DEFAULT_FALLBACK_CONFIDENCE);
    assert_eq!(summary.provenance, Provenance::Fallback);
    assert_eq!(summary.sources_used, 5);
    assert_eq!(summary.key_points.len(), 3);
}
