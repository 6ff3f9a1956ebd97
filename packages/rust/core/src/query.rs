//! News-search query and time-window construction for an event.
//!
//! Pure functions of the [`Event`]: no I/O, no clock reads except in
//! [`QueryBuilder::time_window`], which delegates to the deterministic
//! [`QueryBuilder::time_window_at`].

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use marketlens_shared::{Event, QueryConfig, TimeWindow};

use crate::text::{TOKEN_RE, is_capitalized, is_generic_tag, is_numeral, is_salient, is_stop_word};

/// Longest run of capitalised words emitted as one quoted phrase.
const MAX_PHRASE_WORDS: usize = 3;

/// How a query term was found. Earlier variants are placed first in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    /// Proper noun or short capitalised phrase from the title.
    Entity,
    /// Number or date fragment from the title.
    Numeral,
    /// Any other salient title word.
    Keyword,
    /// Non-generic event tag.
    Tag,
}

/// One search term with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub text: String,
    pub kind: TermKind,
}

impl QueryTerm {
    /// Multi-word terms are quoted for exact-phrase matching.
    pub fn render(&self) -> String {
        if self.text.contains(char::is_whitespace) {
            format!("\"{}\"", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Derives a search query and a date window from an event.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    config: QueryConfig,
}

impl QueryBuilder {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Space-joined query string of at most `max_terms` terms.
    pub fn build_query(&self, event: &Event) -> String {
        self.query_terms(event)
            .iter()
            .map(QueryTerm::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Salient terms from the title and tags, proper nouns and numerals first.
    pub fn query_terms(&self, event: &Event) -> Vec<QueryTerm> {
        let mut terms = title_terms(&event.title);
        terms.extend(
            event
                .tags
                .iter()
                // A stray quote would unbalance the rendered phrase.
                .map(|t| t.replace('"', " ").split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty() && !is_generic_tag(t) && !is_stop_word(t))
                .map(|text| QueryTerm {
                    text,
                    kind: TermKind::Tag,
                }),
        );

        let mut seen = HashSet::new();
        terms.retain(|t| seen.insert(t.text.to_lowercase()));
        // Stable: appearance order is kept within each kind.
        terms.sort_by_key(|t| t.kind);
        terms.truncate(self.config.max_terms);
        terms
    }

    /// Search window for `event`, relative to the current time.
    pub fn time_window(&self, event: &Event) -> TimeWindow {
        self.time_window_at(event, Utc::now())
    }

    /// Search window for `event` as seen at `now`.
    ///
    /// Runs from the event's start date minus the look-back through the
    /// earlier of its end date and `now`. An event without a start date, or
    /// whose start lies beyond the end bound, gets a trailing window of
    /// `default_days_back` days instead.
    pub fn time_window_at(&self, event: &Event, now: DateTime<Utc>) -> TimeWindow {
        let end = match event.end_date {
            Some(end_date) if end_date < now => end_date,
            _ => now,
        };

        let fallback = || TimeWindow::trailing(end, self.config.default_days_back);
        match event.start_date {
            Some(start_date) => Duration::try_days(self.config.look_back_days)
                .and_then(|look_back| start_date.checked_sub_signed(look_back))
                .and_then(|start| TimeWindow::new(start, end).ok())
                .unwrap_or_else(fallback),
            None => fallback(),
        }
    }
}

/// Classify title tokens, grouping adjacent capitalised words into phrases.
pub(crate) fn title_terms(title: &str) -> Vec<QueryTerm> {
    let mut terms = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut prev_end = 0;

    for m in TOKEN_RE.find_iter(title) {
        let word = m.as_str();
        let adjacent = title[prev_end..m.start()].trim().is_empty();
        prev_end = m.end();

        if is_capitalized(word) && !is_stop_word(word) {
            if !adjacent {
                flush_run(&mut run, &mut terms);
            }
            run.push(word);
            continue;
        }

        flush_run(&mut run, &mut terms);
        if !is_salient(word) {
            continue;
        }
        let kind = if is_numeral(word) {
            TermKind::Numeral
        } else {
            TermKind::Keyword
        };
        terms.push(QueryTerm {
            text: word.to_string(),
            kind,
        });
    }
    flush_run(&mut run, &mut terms);
    terms
}

fn flush_run(run: &mut Vec<&str>, terms: &mut Vec<QueryTerm>) {
    match run.len() {
        0 => {}
        2..=MAX_PHRASE_WORDS => terms.push(QueryTerm {
            text: run.join(" "),
            kind: TermKind::Entity,
        }),
        _ => terms.extend(run.iter().filter(|w| is_salient(w)).map(|w| QueryTerm {
            text: (*w).to_string(),
            kind: TermKind::Entity,
        })),
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fed_event() -> Event {
        let mut event = Event::new("fed-rate-decision-december", "Fed rate decision December");
        event.tags = vec!["fed".into(), "rates".into()];
        event.start_date = Some(Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap());
        event.end_date = Some(Utc.with_ymd_and_hms(2025, 12, 4, 0, 0, 0).unwrap());
        event
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn fed_query_contains_salient_terms() {
        let query = QueryBuilder::default().build_query(&fed_event());
        assert!(query.contains("Fed"), "{query}");
        assert!(query.contains("rate"), "{query}");
        assert!(query.contains("December"), "{query}");
        assert_eq!(query, "Fed December rate decision rates");
    }

    #[test]
    fn proper_nouns_and_numerals_lead() {
        let event = Event::new("btc", "Will bitcoin reach 150k by December 31?");
        let terms = QueryBuilder::default().query_terms(&event);
        let texts: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["December", "150k", "31", "bitcoin", "reach"]);
        assert_eq!(terms[0].kind, TermKind::Entity);
        assert_eq!(terms[1].kind, TermKind::Numeral);
    }

    #[test]
    fn adjacent_capitalised_words_become_a_phrase() {
        let event = Event::new("trump", "Will Donald Trump meet Xi Jinping in 2025?");
        let query = QueryBuilder::default().build_query(&event);
        assert_eq!(query, "\"Donald Trump\" \"Xi Jinping\" 2025 meet");
    }

    #[test]
    fn generic_and_duplicate_tags_are_skipped() {
        let mut event = Event::new("e", "Fed decision");
        event.tags = vec!["Politics".into(), "FED".into(), "Jerome Powell".into(), " ".into()];
        let query = QueryBuilder::default().build_query(&event);
        assert_eq!(query, "Fed decision \"Jerome Powell\"");
    }

    #[test]
    fn quotes_in_tags_are_stripped() {
        let mut event = Event::new("e", "Fed decision");
        event.tags = vec!["\"Jerome Powell".into(), "\"\"".into(), "ECB\"".into()];
        let query = QueryBuilder::default().build_query(&event);
        assert_eq!(query, "Fed decision \"Jerome Powell\" ECB");
        assert_eq!(query.matches('"').count() % 2, 0);
    }

    #[test]
    fn query_is_capped() {
        let event = Event::new(
            "long",
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima",
        );
        let builder = QueryBuilder::new(QueryConfig {
            max_terms: 4,
            ..QueryConfig::default()
        });
        assert_eq!(builder.query_terms(&event).len(), 4);
        assert_eq!(builder.build_query(&event), "alpha bravo charlie delta");
        assert_eq!(QueryBuilder::default().query_terms(&event).len(), 10);
    }

    #[test]
    fn punctuation_only_title_yields_empty_query() {
        let event = Event::new("q", "??? -- !!!");
        assert_eq!(QueryBuilder::default().build_query(&event), "");
    }

    #[test]
    fn window_for_resolved_event() {
        let window = QueryBuilder::default().time_window_at(&fed_event(), day(2026, 1, 15));
        assert_eq!(window.start(), day(2025, 10, 4));
        assert_eq!(window.end(), day(2025, 12, 4));
    }

    #[test]
    fn window_for_active_event_ends_now() {
        let now = day(2025, 11, 20);
        let window = QueryBuilder::default().time_window_at(&fed_event(), now);
        assert_eq!(window.start(), day(2025, 10, 4));
        assert_eq!(window.end(), now);
    }

    #[test]
    fn window_without_dates_is_trailing() {
        let now = day(2025, 11, 20);
        let event = Event::new("undated", "Something happens");
        let window = QueryBuilder::default().time_window_at(&event, now);
        assert_eq!(window.end(), now);
        assert_eq!(window.start(), day(2025, 11, 13));
    }

    #[test]
    fn window_with_far_future_start_is_repaired() {
        let now = day(2025, 11, 20);
        let mut event = Event::new("future", "Launch");
        event.start_date = Some(day(2026, 6, 1));
        let window = QueryBuilder::default().time_window_at(&event, now);
        assert!(window.start() <= window.end());
        assert_eq!(window.end(), now);
    }

    #[test]
    fn oversized_look_back_falls_back_to_trailing_window() {
        let now = day(2025, 11, 20);
        let builder = QueryBuilder::new(QueryConfig {
            look_back_days: 100_000_000,
            ..QueryConfig::default()
        });
        let window = builder.time_window_at(&fed_event(), now);
        assert_eq!(window.end(), now);
        assert_eq!(window.start(), day(2025, 11, 13));
    }

    #[test]
    fn window_is_always_ordered() {
        let now = day(2025, 11, 20);
        let dates = [None, Some(day(2020, 1, 1)), Some(day(2025, 11, 19)), Some(day(2030, 1, 1))];
        let builder = QueryBuilder::default();
        for start in dates {
            for end in dates {
                let mut event = Event::new("e", "E");
                event.start_date = start;
                event.end_date = end;
                let window = builder.time_window_at(&event, now);
                assert!(window.start() <= window.end(), "{start:?} {end:?}");
            }
        }
    }
}
