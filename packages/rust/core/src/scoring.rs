//! Relevance scoring of (event, article) pairs.
//!
//! ```text
//! score = ( title_weight       × |vocab ∩ title tokens|
//!         + description_weight × |vocab ∩ description tokens|
//!         + content_weight     × |vocab ∩ content tokens|
//!         + entity_weight      × entities named in the title
//!         + recency_weight     × 2^(−gap_days / half_life) )
//!         × source_multiplier
//! ```
//!
//! `vocab` is the event's title and tag vocabulary, `gap_days` the distance
//! between `published_at` and the search window's centre. All weights come
//! from [`ScoringWeights`]; the result is deterministic, finite, and `>= 0`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use marketlens_shared::{Article, Event, ScoredArticle, ScoringWeights, TimeWindow};

use crate::query::{TermKind, title_terms};
use crate::text::{TOKEN_RE, is_generic_tag, token_set};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Scores articles against one event and search window.
#[derive(Debug, Clone)]
pub struct RelevanceScorer<'a> {
    weights: &'a ScoringWeights,
    vocabulary: HashSet<String>,
    /// `(normalized, display)` pairs, e.g. `("donald trump", "Donald Trump")`.
    entities: Vec<(String, String)>,
    center: DateTime<Utc>,
}

impl<'a> RelevanceScorer<'a> {
    pub fn new(event: &Event, window: TimeWindow, weights: &'a ScoringWeights) -> Self {
        let mut vocabulary = token_set(&event.title);
        for tag in event.tags.iter().filter(|t| !is_generic_tag(t)) {
            vocabulary.extend(token_set(tag));
        }

        let entities = title_terms(&event.title)
            .into_iter()
            .filter(|t| t.kind == TermKind::Entity)
            .map(|t| (normalize_phrase(&t.text), t.text))
            .collect();

        Self {
            weights,
            vocabulary,
            entities,
            center: window.center(),
        }
    }

    /// Relevance of `article` to the event.
    pub fn score(&self, article: &Article) -> f64 {
        self.evaluate(article).0
    }

    /// Score `article` and record which factors contributed.
    pub fn score_article(&self, article: Article) -> ScoredArticle {
        let (score, match_reasons) = self.evaluate(&article);
        ScoredArticle {
            article,
            score,
            match_reasons,
        }
    }

    fn evaluate(&self, article: &Article) -> (f64, Vec<String>) {
        let w = self.weights;
        let mut reasons = Vec::new();
        let mut total = 0.0;

        let fields = [
            ("title_match", Some(article.title.as_str()), w.title_weight),
            ("desc_match", article.description.as_deref(), w.description_weight),
            ("content_match", article.content.as_deref(), w.content_weight),
        ];
        for (label, text, weight) in fields {
            let hits = text.map_or(0, |t| self.overlap(t));
            if hits > 0 {
                total += weight * hits as f64;
                reasons.push(format!("{label}:{hits}"));
            }
        }

        let title_phrase = format!(" {} ", normalize_phrase(&article.title));
        for (needle, display) in &self.entities {
            if title_phrase.contains(&format!(" {needle} ")) {
                total += w.entity_weight;
                reasons.push(format!("entity:{display}"));
            }
        }

        let factor = self.recency_factor(article.published_at);
        total += w.recency_weight * factor;
        if factor >= 0.5 {
            reasons.push("recent".into());
        }

        if self.is_credible(&article.source_name) {
            total *= w.credible_source_multiplier;
            reasons.push("quality_source".into());
        }

        let score = if total.is_finite() { total.max(0.0) } else { 0.0 };
        (score, reasons)
    }

    /// Number of distinct event terms appearing in `text`.
    fn overlap(&self, text: &str) -> usize {
        token_set(text)
            .iter()
            .filter(|t| self.vocabulary.contains(*t))
            .count()
    }

    /// 1.0 at the window centre, halving every `recency_half_life_days`.
    fn recency_factor(&self, published_at: DateTime<Utc>) -> f64 {
        let gap_days =
            (published_at - self.center).num_seconds().unsigned_abs() as f64 / SECONDS_PER_DAY;
        0.5_f64.powf(gap_days / self.weights.recency_half_life_days)
    }

    fn is_credible(&self, source_name: &str) -> bool {
        let source = source_name.to_lowercase();
        self.weights
            .credible_sources
            .iter()
            .any(|s| !s.is_empty() && source.contains(&s.to_lowercase()))
    }
}

fn normalize_phrase(text: &str) -> String {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
