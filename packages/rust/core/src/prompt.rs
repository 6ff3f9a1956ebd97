//! Prompt construction and response parsing for generative summaries.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use marketlens_shared::{
    Article, Event, EventSummary, MarketLensError, Prompt, Provenance, ProviderError, Sentiment,
};

use crate::text::truncate_chars;

/// Confidence assigned to the `high` / `medium` / `low` labels.
pub const HIGH_CONFIDENCE: f64 = 0.85;
pub const MEDIUM_CONFIDENCE: f64 = 0.6;
pub const LOW_CONFIDENCE: f64 = 0.35;

const SYSTEM_PROMPT: &str = "\
You are a financial analyst assistant that summarizes news for prediction market events.

Your task:
1. Analyze the news articles related to the prediction market event
2. Write a concise, objective summary
3. Extract the key points that could move the market
4. Assess overall sentiment: positive (event more likely), negative (less likely), neutral (unclear) or mixed (conflicting reports)
5. Rate your confidence from 0 to 1 based on the quality and relevance of the coverage

Rules:
- Stay objective and do not predict outcomes
- Use only facts from the articles
- Point out conflicting information
- Keep the summary under 150 words
- Reply with a single JSON object and nothing else";

const RESPONSE_FORMAT: &str = r#"{
  "summary": "Two or three sentence overview of the situation",
  "key_points": ["Point 1", "Point 2", "Point 3"],
  "sentiment": "positive|negative|neutral|mixed",
  "confidence": 0.0
}"#;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("valid regex"));

/// Limits applied while rendering the user prompt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PromptLimits {
    pub max_articles: usize,
    pub description_chars: usize,
    pub excerpt_chars: usize,
}

/// Render the system and user messages for `event` and its articles.
pub(crate) fn build_prompt<A: AsRef<Article>>(
    event: &Event,
    articles: &[A],
    limits: PromptLimits,
) -> Prompt {
    let description = match event.description.trim() {
        "" => "N/A".to_string(),
        d => truncate_chars(d, limits.description_chars),
    };
    let price = event
        .leading_price()
        .map_or_else(|| "N/A".to_string(), |p| format!("{:.0}% Yes", p * 100.0));

    let mut user = String::new();
    let _ = writeln!(user, "Prediction Market Event:");
    let _ = writeln!(user, "Title: {}", event.title);
    let _ = writeln!(user, "Description: {description}");
    let _ = writeln!(user, "Current Market Price: {price}");
    let _ = writeln!(user);
    let _ = writeln!(user, "Related News Articles:");

    for (i, article) in articles.iter().take(limits.max_articles).enumerate() {
        let a = article.as_ref();
        let _ = writeln!(user, "{}. [{}] {}", i + 1, a.source_name, a.title);
        let excerpt = a
            .description
            .as_deref()
            .or(a.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(excerpt) = excerpt {
            let _ = writeln!(user, "   {}", truncate_chars(excerpt, limits.excerpt_chars));
        }
    }

    let _ = writeln!(user);
    let _ = write!(user, "Respond in this JSON format:\n{RESPONSE_FORMAT}");

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    summary: String,
    key_points: Vec<String>,
    sentiment: String,
    confidence: RawConfidence,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawConfidence {
    Score(f64),
    Label(String),
}

impl RawConfidence {
    fn resolve(self) -> Result<f64, ProviderError> {
        match self {
            Self::Score(v) if (0.0..=1.0).contains(&v) => Ok(v),
            Self::Score(v) => Err(malformed(format!("confidence {v} outside [0, 1]"))),
            Self::Label(label) => match label.trim().to_ascii_lowercase().as_str() {
                "high" => Ok(HIGH_CONFIDENCE),
                "medium" => Ok(MEDIUM_CONFIDENCE),
                "low" => Ok(LOW_CONFIDENCE),
                other => other
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("unknown confidence label: {other}")))
                    .and_then(|v| RawConfidence::Score(v).resolve()),
            },
        }
    }
}

/// Parse a completion into a validated generative summary.
///
/// Anything short of a complete, valid summary is [`ProviderError::Malformed`].
pub(crate) fn parse_response(
    text: &str,
    sources_used: usize,
    model: &str,
) -> Result<EventSummary, ProviderError> {
    let json = extract_json(text).ok_or_else(|| malformed("no JSON object in response"))?;
    let raw: RawSummary =
        serde_json::from_str(json).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let sentiment: Sentiment = raw
        .sentiment
        .parse()
        .map_err(|e: MarketLensError| malformed(e.to_string()))?;
    let confidence = raw.confidence.resolve()?;
    let key_points: Vec<String> = raw
        .key_points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    EventSummary::new(
        raw.summary,
        key_points,
        sentiment,
        confidence,
        sources_used,
        Provenance::Generative {
            model: model.to_string(),
        },
    )
    .map_err(|e| malformed(e.to_string()))
}

/// The outermost `{...}` span, looking inside a markdown fence if present.
fn extract_json(text: &str) -> Option<&str> {
    let body = FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn malformed(msg: impl Into<String>) -> ProviderError {
    ProviderError::Malformed(msg.into())
}
