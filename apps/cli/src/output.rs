//! Text and JSON rendering of command results.

use color_eyre::eyre::Result;
use serde::Serialize;

use marketlens_core::{EventBrief, MatchOutcome};
use marketlens_shared::{Event, EventSummary, Provenance, ScoredArticle};

/// Output format for command results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// One digest row: a brief, or the reason the event could not be briefed.
#[derive(Debug, Serialize)]
pub(crate) struct DigestEntry {
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<EventBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health of one upstream service.
#[derive(Debug, Serialize)]
pub(crate) struct ServiceHealth {
    pub service: &'static str,
    /// `ok`, `degraded` or `not_configured`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_events(events: &[Event], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(events);
    }
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }
    for event in events {
        println!("{}", event.title);
        println!(
            "  slug: {}  volume: ${:.0}  price: {}",
            event.slug,
            event.volume,
            price_label(event)
        );
        if !event.tags.is_empty() {
            println!("  tags: {}", event.tags.join(", "));
        }
    }
    Ok(())
}

pub(crate) fn print_match(
    event: &Event,
    outcome: &MatchOutcome,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(outcome);
    }
    println!("{}  ({})", event.title, event.slug);
    println!("  Query:  {}", outcome.query);
    println!("  Window: {}", outcome.window);
    println!();
    print_articles(&outcome.articles, outcome.candidates);
    Ok(())
}

pub(crate) fn print_brief(event: &Event, brief: &EventBrief, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(brief);
    }
    println!("{}  ({})", brief.title, brief.slug);
    println!("  Price:  {}", price_label(event));
    println!("  Query:  {}", brief.query);
    println!("  Window: {}", brief.window);
    println!();
    print_articles(&brief.articles, brief.articles.len());
    println!();
    print_summary(&brief.summary);
    println!();
    println!("  ({:.1}s)", brief.elapsed.as_secs_f64());
    Ok(())
}

pub(crate) fn print_digest(entries: &[DigestEntry], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(entries);
    }
    for entry in entries {
        println!("== {}  ({})", entry.title, entry.slug);
        match (&entry.brief, &entry.error) {
            (Some(brief), _) => {
                println!("  {} article(s)", brief.articles.len());
                print_summary(&brief.summary);
            }
            (None, Some(error)) => println!("  news search failed: {error}"),
            (None, None) => {}
        }
        println!();
    }
    Ok(())
}

pub(crate) fn print_health(report: &[ServiceHealth], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    for service in report {
        match &service.detail {
            Some(detail) => println!("  {:<8} {:<15} {detail}", service.service, service.status),
            None => println!("  {:<8} {}", service.service, service.status),
        }
    }
    Ok(())
}

fn print_articles(articles: &[ScoredArticle], candidates: usize) {
    if articles.is_empty() {
        println!("  No related articles found.");
        return;
    }
    println!("  Articles ({} of {candidates} candidates):", articles.len());
    for (i, scored) in articles.iter().enumerate() {
        let a = &scored.article;
        println!(
            "  {:>2}. [{}] {}  (score {:.1}, {})",
            i + 1,
            a.source_name,
            a.title,
            scored.score,
            a.published_at.format("%Y-%m-%d")
        );
        println!("      {}", a.url);
    }
}

fn print_summary(summary: &EventSummary) {
    let origin = match &summary.provenance {
        Provenance::Generative { model } => format!("AI, {model}"),
        Provenance::Fallback => "headline digest".to_string(),
    };
    println!(
        "  Summary ({origin}; sentiment {}; confidence {:.2}):",
        summary.sentiment, summary.confidence
    );
    println!("    {}", summary.summary);
    for point in &summary.key_points {
        println!("    - {point}");
    }
}

fn price_label(event: &Event) -> String {
    event
        .leading_price()
        .map_or_else(|| "N/A".to_string(), |p| format!("{:.0}% Yes", p * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketlens_shared::Market;

    #[test]
    fn price_label_uses_leading_market() {
        let mut event = Event::new("e", "E");
        assert_eq!(price_label(&event), "N/A");
        event.markets = vec![
            Market::new("m", "q", vec!["Yes".into(), "No".into()], vec![0.62, 0.38]).unwrap(),
        ];
        assert_eq!(price_label(&event), "62% Yes");
    }

    #[test]
    fn digest_entry_omits_missing_parts() {
        let entry = DigestEntry {
            slug: "s".into(),
            title: "T".into(),
            brief: None,
            error: Some("news search timed out after 30s".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("brief").is_none());
        assert_eq!(json["error"], "news search timed out after 30s");
    }
}
