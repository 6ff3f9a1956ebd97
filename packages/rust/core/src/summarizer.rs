//! Event summarization with a deterministic fallback.
//!
//! A configured [`Completion`] provider writes the summary. When there is no
//! provider, no articles, or the provider fails, times out, or answers with
//! something unparseable, a headline digest is produced instead. Callers
//! always get a valid [`EventSummary`].

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use marketlens_shared::{
    AppConfig, Article, Completion, CompletionBudget, DEFAULT_FALLBACK_CONFIDENCE, Event,
    EventSummary, Provenance, ProviderError, Sentiment,
};

use crate::prompt::{PromptLimits, build_prompt, parse_response};
use crate::text::truncate_chars;

/// Headline length used in fallback key points.
const FALLBACK_HEADLINE_CHARS: usize = 80;

/// Summarizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    /// Confidence reported by the fallback summary.
    pub fallback_confidence: f64,
    /// Articles included in the prompt.
    pub max_prompt_articles: usize,
    /// Headlines listed by the fallback summary.
    pub max_headlines: usize,
    pub description_chars: usize,
    pub excerpt_chars: usize,
    pub budget: CompletionBudget,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
            max_prompt_articles: 5,
            max_headlines: 3,
            description_chars: 300,
            excerpt_chars: 200,
            budget: CompletionBudget::default(),
        }
    }
}

impl From<&AppConfig> for SummarizerConfig {
    fn from(config: &AppConfig) -> Self {
        let s = &config.summarizer;
        Self {
            fallback_confidence: s.fallback_confidence,
            max_prompt_articles: s.max_prompt_articles,
            max_headlines: s.max_headlines,
            budget: CompletionBudget {
                max_tokens: s.max_tokens,
                temperature: s.temperature,
                timeout: Duration::from_secs(s.timeout_secs),
            },
            ..Self::default()
        }
    }
}

/// Why the fallback path was taken.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NotConfigured,
    NoArticles,
    Provider(ProviderError),
}

/// Which path produced a summary.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Generative(EventSummary),
    Fallback {
        summary: EventSummary,
        reason: FallbackReason,
    },
}

impl SummaryOutcome {
    pub fn summary(&self) -> &EventSummary {
        match self {
            Self::Generative(summary) | Self::Fallback { summary, .. } => summary,
        }
    }

    pub fn into_summary(self) -> EventSummary {
        match self {
            Self::Generative(summary) | Self::Fallback { summary, .. } => summary,
        }
    }
}

/// Produces an [`EventSummary`] for an event and its matched articles.
pub struct Summarizer<'a> {
    completion: Option<&'a dyn Completion>,
    config: SummarizerConfig,
}

impl<'a> Summarizer<'a> {
    pub fn new(completion: Option<&'a dyn Completion>, config: SummarizerConfig) -> Self {
        Self { completion, config }
    }

    /// Summarizer that only ever produces the fallback digest.
    pub fn fallback_only(config: SummarizerConfig) -> Self {
        Self::new(None, config)
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `articles` for `event`. Never fails.
    pub async fn summarize<A: AsRef<Article>>(
        &self,
        event: &Event,
        articles: &[A],
    ) -> EventSummary {
        self.summarize_outcome(event, articles).await.into_summary()
    }

    /// Like [`Summarizer::summarize`], also reporting which path was taken.
    #[instrument(skip_all, fields(slug = %event.slug, articles = articles.len()))]
    pub async fn summarize_outcome<A: AsRef<Article>>(
        &self,
        event: &Event,
        articles: &[A],
    ) -> SummaryOutcome {
        let Some(completion) = self.completion else {
            debug!("no completion provider configured");
            return self.fallback(event, articles, FallbackReason::NotConfigured);
        };
        if articles.is_empty() {
            return self.fallback(event, articles, FallbackReason::NoArticles);
        }

        match self.generate(completion, event, articles).await {
            Ok(summary) => {
                info!(model = completion.model(), "generated summary");
                SummaryOutcome::Generative(summary)
            }
            Err(err) => {
                warn!(error = %err, "completion failed, using fallback summary");
                self.fallback(event, articles, FallbackReason::Provider(err))
            }
        }
    }

    async fn generate<A: AsRef<Article>>(
        &self,
        completion: &dyn Completion,
        event: &Event,
        articles: &[A],
    ) -> Result<EventSummary, ProviderError> {
        let limits = PromptLimits {
            max_articles: self.config.max_prompt_articles,
            description_chars: self.config.description_chars,
            excerpt_chars: self.config.excerpt_chars,
        };
        let prompt = build_prompt(event, articles, limits);
        let budget = self.config.budget;

        let text = tokio::time::timeout(budget.timeout, completion.complete(&prompt, &budget))
            .await
            .map_err(|_| ProviderError::Timeout {
                after: budget.timeout,
            })??;

        let sources_used = articles.len().min(self.config.max_prompt_articles);
        parse_response(&text, sources_used, completion.model())
    }

    fn fallback<A: AsRef<Article>>(
        &self,
        event: &Event,
        articles: &[A],
        reason: FallbackReason,
    ) -> SummaryOutcome {
        let (summary, key_points) = if articles.is_empty() {
            (
                format!("{}: no related news coverage found.", event.title),
                vec!["No recent news coverage".to_string()],
            )
        } else {
            let n = articles.len();
            let plural = if n == 1 { "" } else { "s" };
            let headlines = articles
                .iter()
                .take(self.config.max_headlines.max(1))
                .map(|a| {
                    let a = a.as_ref();
                    format!(
                        "[{}] {}",
                        a.source_name,
                        truncate_chars(&a.title, FALLBACK_HEADLINE_CHARS)
                    )
                })
                .collect();
            (
                format!(
                    "{}: {n} related headline{plural} found; AI summary unavailable.",
                    event.title
                ),
                headlines,
            )
        };

        let confidence = if (0.0..=1.0).contains(&self.config.fallback_confidence) {
            self.config.fallback_confidence
        } else {
            DEFAULT_FALLBACK_CONFIDENCE
        };

        SummaryOutcome::Fallback {
            summary: EventSummary {
                summary,
                key_points,
                sentiment: Sentiment::Neutral,
                confidence,
                sources_used: articles.len(),
                provenance: Provenance::Fallback,
            },
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use marketlens_shared::Prompt;

    /// Answers every prompt with the same text and counts calls.
    struct CannedCompletion {
        reply: Result<String, ProviderError>,
        calls: AtomicUsize,
    }

    impl CannedCompletion {
        fn new(reply: Result<String, ProviderError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Completion for CannedCompletion {
        async fn complete(
            &self,
            _prompt: &Prompt,
            _budget: &CompletionBudget,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }

        fn model(&self) -> &str {
            "canned-model"
        }
    }

    /// Never answers.
    struct SilentCompletion;

    #[async_trait]
    impl Completion for SilentCompletion {
        async fn complete(
            &self,
            _prompt: &Prompt,
            _budget: &CompletionBudget,
        ) -> Result<String, ProviderError> {
            std::future::pending().await
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    const GOOD_REPLY: &str = r#"{"summary": "Analysts expect a December cut.", "key_points": ["Inflation cooled", "Powell signalled patience"], "sentiment": "mixed", "confidence": "high"}"#;

    fn event() -> Event {
        Event::new("fed-rate-decision-december", "Fed rate decision December")
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article {
                source_name: format!("Wire {i}"),
                author: None,
                title: format!("Fed story {i}"),
                description: Some("Rates in focus".into()),
                url: format!("https://n.example/{i}"),
                image_url: None,
                published_at: Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap(),
                content: None,
            })
            .collect()
    }

    fn assert_valid(summary: &EventSummary) {
        assert!(!summary.summary.trim().is_empty());
        assert!(!summary.key_points.is_empty());
        assert!((0.0..=1.0).contains(&summary.confidence));
    }

    #[tokio::test]
    async fn generative_path() {
        let completion = CannedCompletion::new(Ok(GOOD_REPLY.into()));
        let summarizer = Summarizer::new(Some(&completion), SummarizerConfig::default());
        let outcome = summarizer.summarize_outcome(&event(), &articles(3)).await;

        let SummaryOutcome::Generative(summary) = outcome else {
            panic!("expected generative summary, got {outcome:?}");
        };
        assert_valid(&summary);
        assert_eq!(summary.sentiment, Sentiment::Mixed);
        assert_eq!(summary.confidence, crate::prompt::HIGH_CONFIDENCE);
        assert_eq!(summary.sources_used, 3);
        assert!(summary.provenance.is_generative());
    }

    #[tokio::test]
    async fn fallback_without_provider() {
        let summarizer = Summarizer::fallback_only(SummarizerConfig::default());
        let outcome = summarizer.summarize_outcome(&event(), &articles(5)).await;
        assert!(matches!(
            outcome,
            SummaryOutcome::Fallback {
                reason: FallbackReason::NotConfigured,
                ..
            }
        ));

        let summary = outcome.into_summary();
        assert_valid(&summary);
        assert_eq!(
            summary.summary,
            "Fed rate decision December: 5 related headlines found; AI summary unavailable."
        );
        assert_eq!(summary.key_points.len(), 3);
        assert_eq!(summary.key_points[0], "[Wire 0] Fed story 0");
        assert_eq!(summary.sentiment, Sentiment::Neutral);
        assert_eq!(summary.confidence, DEFAULT_FALLBACK_CONFIDENCE);
        assert_eq!(summary.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn no_articles_skips_provider() {
        let completion = CannedCompletion::new(Ok(GOOD_REPLY.into()));
        let summarizer = Summarizer::new(Some(&completion), SummarizerConfig::default());
        let summary = summarizer.summarize::<Article>(&event(), &[]).await;

        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
        assert_valid(&summary);
        assert_eq!(summary.key_points, ["No recent news coverage"]);
        assert_eq!(summary.sources_used, 0);
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let completion = CannedCompletion::new(Err(ProviderError::Http {
            status: 500,
            body: "boom".into(),
        }));
        let summarizer = Summarizer::new(Some(&completion), SummarizerConfig::default());
        let outcome = summarizer.summarize_outcome(&event(), &articles(1)).await;

        assert!(matches!(
            &outcome,
            SummaryOutcome::Fallback {
                reason: FallbackReason::Provider(ProviderError::Http { status: 500, .. }),
                ..
            }
        ));
        let summary = outcome.summary();
        assert_eq!(
            summary.summary,
            "Fed rate decision December: 1 related headline found; AI summary unavailable."
        );
    }

    #[tokio::test]
    async fn malformed_reply_falls_back() {
        let completion = CannedCompletion::new(Ok(
            r#"{"summary": "half", "key_points": ["a"], "sentiment": "neutral"}"#.into(),
        ));
        let summarizer = Summarizer::new(Some(&completion), SummarizerConfig::default());
        let outcome = summarizer.summarize_outcome(&event(), &articles(2)).await;

        assert!(matches!(
            outcome,
            SummaryOutcome::Fallback {
                reason: FallbackReason::Provider(ProviderError::Malformed(_)),
                ..
            }
        ));
        assert_eq!(outcome.summary().provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let config = SummarizerConfig {
            budget: CompletionBudget {
                timeout: Duration::from_millis(20),
                ..CompletionBudget::default()
            },
            ..SummarizerConfig::default()
        };
        let summarizer = Summarizer::new(Some(&SilentCompletion), config);
        let outcome = summarizer.summarize_outcome(&event(), &articles(2)).await;
        assert!(matches!(
            outcome,
            SummaryOutcome::Fallback {
                reason: FallbackReason::Provider(ProviderError::Timeout { .. }),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn long_headlines_are_truncated() {
        let mut long = articles(1);
        long[0].title = "word ".repeat(40);
        let summary = Summarizer::fallback_only(SummarizerConfig::default())
            .summarize(&event(), &long)
            .await;
        assert!(summary.key_points[0].ends_with("..."));
        assert!(summary.key_points[0].chars().count() <= "[Wire 0] ".len() + 83);
    }

    #[test]
    fn config_from_app_config() {
        let mut app = AppConfig::default();
        app.summarizer.timeout_secs = 9;
        app.summarizer.max_headlines = 2;
        let config = SummarizerConfig::from(&app);
        assert_eq!(config.budget.timeout, Duration::from_secs(9));
        assert_eq!(config.max_headlines, 2);
        assert_eq!(config.excerpt_chars, 200);
    }
}
