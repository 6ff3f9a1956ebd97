//! Event-to-news matching: query → search → score → de-duplicate → rank → cap.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument};

use marketlens_shared::{
    AppConfig, Article, Event, MAX_ARTICLES_RANGE, MarketLensError, NewsSearch, Result,
    ScoredArticle, ScoringWeights, TimeWindow, UpstreamError,
};

use crate::query::QueryBuilder;
use crate::scoring::RelevanceScorer;

/// Default upper bound on one news search.
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call matching options.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Maximum number of articles returned (1–10, enforced by [`MatchOptions::new`]).
    pub max_articles: usize,
    /// Articles scoring below this are dropped.
    pub min_score: f64,
    /// Upper bound on the news-search call.
    pub search_timeout: Duration,
}

impl MatchOptions {
    /// Options for `max_articles` results; rejects values outside 1–10.
    pub fn new(max_articles: usize) -> Result<Self> {
        if !MAX_ARTICLES_RANGE.contains(&max_articles) {
            return Err(MarketLensError::validation(format!(
                "max_articles must be between {} and {}, got {max_articles}",
                MAX_ARTICLES_RANGE.start(),
                MAX_ARTICLES_RANGE.end()
            )));
        }
        Ok(Self {
            max_articles,
            ..Self::default()
        })
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_articles: 5,
            min_score: 0.0,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

impl From<&AppConfig> for MatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_articles: config.defaults.max_articles,
            min_score: config.defaults.min_score,
            search_timeout: Duration::from_secs(config.newsapi.timeout_secs),
        }
    }
}

/// Query, window, and ranked articles from one match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub query: String,
    pub window: TimeWindow,
    /// Candidates returned by the search before de-duplication and capping.
    pub candidates: usize,
    pub articles: Vec<ScoredArticle>,
}

/// Produces a ranked, capped list of articles for an event.
pub struct Matcher<'a> {
    search: &'a dyn NewsSearch,
    query: QueryBuilder,
    weights: ScoringWeights,
}

impl<'a> Matcher<'a> {
    pub fn new(search: &'a dyn NewsSearch, query: QueryBuilder, weights: ScoringWeights) -> Self {
        Self {
            search,
            query,
            weights,
        }
    }

    /// Matcher with query and scoring settings taken from `config`.
    pub fn from_config(search: &'a dyn NewsSearch, config: &AppConfig) -> Self {
        Self::new(
            search,
            QueryBuilder::new(config.query.clone()),
            config.scoring.clone(),
        )
    }

    /// Ranked articles for `event`, at most `opts.max_articles` of them.
    ///
    /// An empty list means the search found nothing; a search that could not
    /// be completed is an [`UpstreamError`].
    pub async fn match_event(
        &self,
        event: &Event,
        opts: &MatchOptions,
    ) -> std::result::Result<Vec<ScoredArticle>, UpstreamError> {
        Ok(self.match_event_detailed(event, opts).await?.articles)
    }

    /// Like [`Matcher::match_event`], also returning the query and window used.
    #[instrument(skip_all, fields(slug = %event.slug, max_articles = opts.max_articles))]
    pub async fn match_event_detailed(
        &self,
        event: &Event,
        opts: &MatchOptions,
    ) -> std::result::Result<MatchOutcome, UpstreamError> {
        let start = Instant::now();
        let query = self.query.build_query(event);
        let window = self.query.time_window(event);
        debug!(%query, %window, "searching news");

        let found = tokio::time::timeout(opts.search_timeout, self.search.search(&query, &window))
            .await
            .map_err(|_| UpstreamError::Timeout {
                after: opts.search_timeout,
            })??;
        let candidates = found.len();

        let articles = rank(event, window, &self.weights, found, opts);

        info!(
            candidates,
            returned = articles.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "match complete"
        );

        Ok(MatchOutcome {
            query,
            window,
            candidates,
            articles,
        })
    }
}

/// Score, de-duplicate by URL (first seen wins), filter, sort, and cap.
pub fn rank(
    event: &Event,
    window: TimeWindow,
    weights: &ScoringWeights,
    found: Vec<Article>,
    opts: &MatchOptions,
) -> Vec<ScoredArticle> {
    let scorer = RelevanceScorer::new(event, window, weights);
    let mut seen = HashSet::new();

    let mut scored: Vec<ScoredArticle> = found
        .into_iter()
        .filter(|a| {
            let fresh = seen.insert(a.url.clone());
            if !fresh {
                debug!(url = %a.url, "dropping duplicate article");
            }
            fresh
        })
        .map(|a| scorer.score_article(a))
        .filter(|s| s.score >= opts.min_score)
        .collect();

    scored.sort_by(ScoredArticle::rank_cmp);
    scored.truncate(opts.max_articles);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    /// Returns a fixed result and records the queries it saw.
    struct StaticSearch {
        result: std::result::Result<Vec<Article>, UpstreamError>,
        calls: Mutex<Vec<String>>,
    }

    impl StaticSearch {
        fn ok(articles: Vec<Article>) -> Self {
            Self {
                result: Ok(articles),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: UpstreamError) -> Self {
            Self {
                result: Err(err),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NewsSearch for StaticSearch {
        async fn search(
            &self,
            query: &str,
            _window: &TimeWindow,
        ) -> std::result::Result<Vec<Article>, UpstreamError> {
            self.calls.lock().unwrap().push(query.to_string());
            self.result.clone()
        }
    }

    /// Never answers.
    struct HangingSearch;

    #[async_trait]
    impl NewsSearch for HangingSearch {
        async fn search(
            &self,
            _query: &str,
            _window: &TimeWindow,
        ) -> std::result::Result<Vec<Article>, UpstreamError> {
            std::future::pending().await
        }
    }

    fn now_minus(days: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::days(days)
    }

    fn event() -> Event {
        let mut event = Event::new("fed-rate-decision", "Fed rate decision");
        event.tags = vec!["fed".into()];
        event
    }

    fn article(url: &str, title: &str, published_at: DateTime<Utc>) -> Article {
        Article {
            source_name: "Wire".into(),
            author: None,
            title: title.into(),
            description: None,
            url: url.into(),
            image_url: None,
            published_at,
            content: None,
        }
    }

    fn matcher(search: &dyn NewsSearch) -> Matcher<'_> {
        Matcher::new(search, QueryBuilder::default(), ScoringWeights::default())
    }

    #[tokio::test]
    async fn passes_built_query_to_search() {
        let search = StaticSearch::ok(vec![]);
        let result = matcher(&search)
            .match_event(&event(), &MatchOptions::default())
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(search.calls.lock().unwrap().as_slice(), ["Fed rate decision"]);
    }

    #[tokio::test]
    async fn caps_and_sorts_results() {
        let titles = [
            "Fed rate decision today",
            "Rate talk",
            "Fed watchers",
            "Unrelated story",
            "Fed decision nears",
            "Rate decision",
            "Another unrelated story",
        ];
        let found: Vec<Article> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| article(&format!("https://n.example/{i}"), t, now_minus(i as i64)))
            .collect();
        let search = StaticSearch::ok(found);

        let opts = MatchOptions::new(5).unwrap();
        let result = matcher(&search).match_event(&event(), &opts).await.unwrap();
        assert_eq!(result.len(), 5);
        for pair in result.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(result[0].article.title, "Fed rate decision today");
    }

    #[test]
    fn equal_scores_prefer_recent() {
        let published = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let older = article("https://n.example/old", "Fed rate", published);
        let newer = article(
            "https://n.example/new",
            "Fed rate",
            published + chrono::Duration::seconds(1),
        );

        // Without a recency term both score identically.
        let weights = ScoringWeights {
            recency_weight: 0.0,
            ..ScoringWeights::default()
        };
        let window = QueryBuilder::default().time_window(&event());
        let ranked = rank(
            &event(),
            window,
            &weights,
            vec![older, newer],
            &MatchOptions::default(),
        );
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].article.url, "https://n.example/new");
    }

    #[tokio::test]
    async fn duplicate_urls_keep_first_seen() {
        let first = article("https://n.example/same", "Weather report", now_minus(3));
        let second = article("https://n.example/same", "Fed rate decision", now_minus(3));
        let other = article("https://n.example/other", "Fed", now_minus(3));
        let search = StaticSearch::ok(vec![first, second, other]);

        let result = matcher(&search)
            .match_event(&event(), &MatchOptions::default())
            .await
            .unwrap();
        let same: Vec<_> = result
            .iter()
            .filter(|s| s.article.url == "https://n.example/same")
            .collect();
        assert_eq!(same.len(), 1);
        assert_eq!(same[0].article.title, "Weather report");
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn upstream_error_is_propagated() {
        let search = StaticSearch::failing(UpstreamError::Http {
            status: 503,
            body: "down".into(),
        });
        let err = matcher(&search)
            .match_event(&event(), &MatchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Http {
                status: 503,
                body: "down".into()
            }
        );
    }

    #[tokio::test]
    async fn search_timeout_becomes_upstream_error() {
        let search = HangingSearch;
        let opts = MatchOptions {
            search_timeout: Duration::from_millis(20),
            ..MatchOptions::default()
        };
        let err = matcher(&search).match_event(&event(), &opts).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout { .. }));
    }

    #[tokio::test]
    async fn min_score_filters_before_cap() {
        let search = StaticSearch::ok(vec![
            article("https://n.example/a", "Fed rate decision", now_minus(1)),
            article("https://n.example/b", "Cooking tips", now_minus(1)),
        ]);
        let opts = MatchOptions {
            min_score: 5.0,
            ..MatchOptions::default()
        };
        let result = matcher(&search).match_event(&event(), &opts).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].article.url, "https://n.example/a");
    }

    #[test]
    fn options_bounds() {
        assert!(MatchOptions::new(0).is_err());
        assert!(MatchOptions::new(11).is_err());
        assert_eq!(MatchOptions::new(10).unwrap().max_articles, 10);
    }

    #[test]
    fn options_from_config() {
        let mut config = AppConfig::default();
        config.defaults.max_articles = 3;
        config.newsapi.timeout_secs = 7;
        let opts = MatchOptions::from(&config);
        assert_eq!(opts.max_articles, 3);
        assert_eq!(opts.search_timeout, Duration::from_secs(7));
    }
}
