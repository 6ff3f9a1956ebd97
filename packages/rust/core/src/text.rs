//! Tokenization helpers shared by query building and relevance scoring.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Words that never help a news search: function words plus market filler.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "to", "for", "of", "and", "or", "is", "are", "was",
    "were", "be", "been", "being", "will", "would", "could", "should", "may", "might", "can",
    "this", "that", "these", "those", "it", "its", "by", "from", "with", "as", "but", "if",
    "then", "than", "so", "what", "which", "who", "whom", "when", "where", "why", "how", "all",
    "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "not", "only",
    "own", "same", "too", "very", "just", "before", "after", "during", "while", "above",
    "below", "over", "under", "into", "does", "did", "has", "have", "had", "market", "markets",
    "resolve", "resolves", "yes",
];

/// Tags too broad to narrow a search.
const GENERIC_TAGS: &[&str] = &[
    "business", "politics", "news", "world", "us", "usa", "america", "global",
    "international", "economy", "economic", "predictions", "all", "featured", "trending",
    "2024", "2025", "2026",
];

/// A word-like run of letters and digits.
pub(crate) static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

pub(crate) fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

pub(crate) fn is_generic_tag(tag: &str) -> bool {
    let lower = tag.trim().to_lowercase();
    GENERIC_TAGS.contains(&lower.as_str())
}

/// Contains at least one digit (years, dates, thresholds like `100k`).
pub(crate) fn is_numeral(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// A token worth matching on: not a stop word, and either a numeral or at
/// least three characters long.
pub(crate) fn is_salient(word: &str) -> bool {
    !is_stop_word(word) && (is_numeral(word) || word.chars().count() > 2)
}

/// Lowercased salient tokens of `text`, as a set.
pub(crate) fn token_set(text: &str) -> HashSet<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| is_salient(w))
        .map(str::to_lowercase)
        .collect()
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
