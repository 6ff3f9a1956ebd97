//! Application configuration for MarketLens.
//!
//! User config lives at `~/.marketlens/marketlens.toml`. Every field has a
//! default, so a missing file or section yields a working configuration.
//! Secrets are never stored here, only the names of the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarketLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "marketlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".marketlens";

/// Confidence reported by the non-generative fallback summary.
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.2;

/// Inclusive bounds for the per-event article cap.
pub const MAX_ARTICLES_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Longest look-back or trailing span, in days, a config may ask for.
pub const MAX_WINDOW_DAYS: i64 = 3650;

// ---------------------------------------------------------------------------
// Config structs (matching marketlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub scoring: ScoringWeights,

    #[serde(default)]
    pub summarizer: SummarizerSection,

    #[serde(default)]
    pub newsapi: NewsApiSection,

    #[serde(default)]
    pub gamma: GammaSection,

    #[serde(default)]
    pub openai: OpenAiSection,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Articles returned per event (1–10).
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Articles scoring below this are dropped before truncation.
    #[serde(default)]
    pub min_score: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            min_score: 0.0,
        }
    }
}

fn default_max_articles() -> usize {
    5
}

/// `[query]` section: search query and time-window construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of terms (a quoted phrase counts as one).
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,

    /// Days searched before the event's start date.
    #[serde(default = "default_look_back_days")]
    pub look_back_days: i64,

    /// Trailing window length when the event has no usable start date.
    #[serde(default = "default_days_back")]
    pub default_days_back: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_terms: default_max_terms(),
            look_back_days: default_look_back_days(),
            default_days_back: default_days_back(),
        }
    }
}

fn default_max_terms() -> usize {
    10
}
fn default_look_back_days() -> i64 {
    30
}
fn default_days_back() -> i64 {
    7
}

/// `[scoring]` section: the relevance formula's weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Per event term found in the article title.
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    /// Per event term found in the article description.
    #[serde(default = "default_description_weight")]
    pub description_weight: f64,

    /// Per event term found in the article content excerpt.
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,

    /// Per named entity from the event title found in the article title.
    #[serde(default = "default_entity_weight")]
    pub entity_weight: f64,

    /// Bonus for an article published exactly at the window centre.
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// Days from the window centre at which the recency bonus halves.
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f64,

    /// Multiplier applied when the source is in `credible_sources`.
    #[serde(default = "default_credible_multiplier")]
    pub credible_source_multiplier: f64,

    /// Case-insensitive substrings of reputable source names. Empty means
    /// no reputation data: every source gets the neutral multiplier 1.0.
    #[serde(default = "default_credible_sources")]
    pub credible_sources: Vec<String>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title_weight: default_title_weight(),
            description_weight: default_description_weight(),
            content_weight: default_content_weight(),
            entity_weight: default_entity_weight(),
            recency_weight: default_recency_weight(),
            recency_half_life_days: default_half_life(),
            credible_source_multiplier: default_credible_multiplier(),
            credible_sources: default_credible_sources(),
        }
    }
}

fn default_title_weight() -> f64 {
    3.0
}
fn default_description_weight() -> f64 {
    1.0
}
fn default_content_weight() -> f64 {
    0.5
}
fn default_entity_weight() -> f64 {
    5.0
}
fn default_recency_weight() -> f64 {
    2.0
}
fn default_half_life() -> f64 {
    3.0
}
fn default_credible_multiplier() -> f64 {
    1.2
}
fn default_credible_sources() -> Vec<String> {
    [
        "reuters",
        "bloomberg",
        "associated press",
        "bbc",
        "cnn",
        "wall street journal",
        "new york times",
        "washington post",
        "financial times",
        "the economist",
        "politico",
        "axios",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[summarizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerSection {
    /// Confidence reported by the non-generative fallback.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    /// Articles included in the prompt.
    #[serde(default = "default_max_prompt_articles")]
    pub max_prompt_articles: usize,

    /// Headlines listed as key points by the fallback.
    #[serde(default = "default_max_headlines")]
    pub max_headlines: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on one completion attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerSection {
    fn default() -> Self {
        Self {
            fallback_confidence: default_fallback_confidence(),
            max_prompt_articles: default_max_prompt_articles(),
            max_headlines: default_max_headlines(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_fallback_confidence() -> f64 {
    DEFAULT_FALLBACK_CONFIDENCE
}
fn default_max_prompt_articles() -> usize {
    5
}
fn default_max_headlines() -> usize {
    3
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[newsapi]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsApiSection {
    /// Name of the env var holding the API key.
    #[serde(default = "default_newsapi_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_newsapi_base_url")]
    pub base_url: String,

    /// Two-letter ISO language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// `relevancy`, `popularity` or `publishedAt`.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Candidates fetched per search (more than returned, for scoring).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NewsApiSection {
    fn default() -> Self {
        Self {
            api_key_env: default_newsapi_key_env(),
            base_url: default_newsapi_base_url(),
            language: default_language(),
            sort_by: default_sort_by(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_newsapi_key_env() -> String {
    "NEWSAPI_KEY".into()
}
fn default_newsapi_base_url() -> String {
    "https://newsapi.org/v2".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_sort_by() -> String {
    "relevancy".into()
}
fn default_page_size() -> u32 {
    20
}

/// `[gamma]` section (Polymarket market data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaSection {
    #[serde(default = "default_gamma_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GammaSection {
    fn default() -> Self {
        Self {
            base_url: default_gamma_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gamma_base_url() -> String {
    "https://gamma-api.polymarket.com".into()
}

/// `[openai]` section (any OpenAI-compatible chat-completions endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSection {
    /// Name of the env var holding the API key. Unset means no AI summaries.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            model: default_model(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject values the pipeline's invariants cannot tolerate.
    pub fn validate(&self) -> Result<()> {
        if !MAX_ARTICLES_RANGE.contains(&self.defaults.max_articles) {
            return Err(MarketLensError::config(format!(
                "defaults.max_articles must be between {} and {}, got {}",
                MAX_ARTICLES_RANGE.start(),
                MAX_ARTICLES_RANGE.end(),
                self.defaults.max_articles
            )));
        }
        if !self.defaults.min_score.is_finite() || self.defaults.min_score < 0.0 {
            return Err(MarketLensError::config("defaults.min_score must be >= 0"));
        }
        if self.query.max_terms == 0 {
            return Err(MarketLensError::config("query.max_terms must be at least 1"));
        }
        for (name, days) in [
            ("look_back_days", self.query.look_back_days),
            ("default_days_back", self.query.default_days_back),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(MarketLensError::config(format!(
                    "query.{name} must be between 0 and {MAX_WINDOW_DAYS}, got {days}"
                )));
            }
        }
        self.scoring.validate()?;
        let conf = self.summarizer.fallback_confidence;
        if !(0.0..=1.0).contains(&conf) {
            return Err(MarketLensError::config(format!(
                "summarizer.fallback_confidence must be within [0, 1], got {conf}"
            )));
        }
        Ok(())
    }
}

impl ScoringWeights {
    /// All weights must be finite and non-negative; the half-life positive.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("title_weight", self.title_weight),
            ("description_weight", self.description_weight),
            ("content_weight", self.content_weight),
            ("entity_weight", self.entity_weight),
            ("recency_weight", self.recency_weight),
            ("credible_source_multiplier", self.credible_source_multiplier),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(MarketLensError::config(format!(
                    "scoring.{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !self.recency_half_life_days.is_finite() || self.recency_half_life_days <= 0.0 {
            return Err(MarketLensError::config(
                "scoring.recency_half_life_days must be > 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.marketlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MarketLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.marketlens/marketlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MarketLensError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MarketLensError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| MarketLensError::io(dir, e))?;
    }
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| MarketLensError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| MarketLensError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

/// Read a secret from the named env var. Empty values count as unset.
pub fn api_key_from_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Like [`api_key_from_env`], but a missing key is a config error.
pub fn require_api_key(var_name: &str, service: &str) -> Result<String> {
    api_key_from_env(var_name).ok_or_else(|| {
        MarketLensError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))
    })
}
