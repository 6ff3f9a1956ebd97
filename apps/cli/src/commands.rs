//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use marketlens_core::{
    EventBrief, MatchOptions, Matcher, ProgressReporter, Summarizer, SummarizerConfig, brief_event,
    brief_event_with_progress,
};
use marketlens_gamma::{EventQuery, GammaClient, GammaConfig};
use marketlens_newsapi::{NewsApiClient, NewsApiConfig};
use marketlens_openai::{OpenAiClient, OpenAiConfig};
use marketlens_shared::{
    AppConfig, Completion, Event, UpstreamError, api_key_from_env, config_file_path,
    init_config_at, load_config, load_config_from, require_api_key,
};

use crate::output::{self, DigestEntry, OutputFormat, ServiceHealth};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MarketLens: news context for prediction markets.
#[derive(Parser)]
#[command(
    name = "marketlens",
    version,
    about = "Match Polymarket events with recent news and summarize the coverage.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Result format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.marketlens/marketlens.toml).
    #[arg(long, global = true, env = "MARKETLENS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List active events by volume.
    Events {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Find active events whose title, description or tags mention some text.
    Search {
        /// Text to look for (case-insensitive).
        text: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the news articles matched to an event.
    Match {
        /// Event slug.
        slug: String,

        /// Articles to return (1-10). Defaults to the configured value.
        #[arg(short = 'n', long)]
        max_articles: Option<usize>,
    },

    /// Match an event with news and summarize the coverage.
    Brief {
        /// Event slug.
        slug: String,

        /// Articles to return (1-10). Defaults to the configured value.
        #[arg(short = 'n', long)]
        max_articles: Option<usize>,

        /// Skip the AI summary and use the headline digest.
        #[arg(long)]
        no_ai: bool,
    },

    /// Brief the top events by volume.
    Digest {
        /// Number of events.
        #[arg(short, long, default_value = "5")]
        limit: u32,

        /// Events briefed at the same time.
        #[arg(short, long, default_value = "3")]
        concurrency: usize,

        /// Articles per event (1-10). Defaults to the configured value.
        #[arg(short = 'n', long)]
        max_articles: Option<usize>,

        /// Skip AI summaries and use headline digests.
        #[arg(long)]
        no_ai: bool,
    },

    /// Check connectivity to Gamma, NewsAPI and OpenAI.
    Health,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const LOG_TARGETS: [&str; 6] = [
    "marketlens_cli",
    "marketlens_core",
    "marketlens_shared",
    "marketlens_newsapi",
    "marketlens_gamma",
    "marketlens_openai",
];

/// Initialize tracing based on CLI flags. Logs go to stderr so `--format
/// json` output on stdout stays machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Events { limit } => cmd_events(&load(config_path)?, limit, format).await,
        Command::Search { text, limit } => {
            cmd_search(&load(config_path)?, &text, limit, format).await
        }
        Command::Match { slug, max_articles } => {
            cmd_match(&load(config_path)?, &slug, max_articles, format).await
        }
        Command::Brief {
            slug,
            max_articles,
            no_ai,
        } => cmd_brief(&load(config_path)?, &slug, max_articles, no_ai, format).await,
        Command::Digest {
            limit,
            concurrency,
            max_articles,
            no_ai,
        } => {
            let config = load(config_path)?;
            cmd_digest(config, limit, concurrency, max_articles, no_ai, format).await
        }
        Command::Health => cmd_health(&load(config_path)?, format).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(&load(config_path)?),
        },
    }
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

fn load(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn gamma_client(config: &AppConfig) -> Result<GammaClient> {
    Ok(GammaClient::new(GammaConfig::from_app_config(config)?)?)
}

fn news_client(config: &AppConfig) -> Result<NewsApiClient> {
    let key = require_api_key(&config.newsapi.api_key_env, "NewsAPI")?;
    Ok(NewsApiClient::new(NewsApiConfig::from_app_config(config, key)?)?)
}

/// OpenAI client, or `None` when AI is disabled or no key is set.
fn openai_client(config: &AppConfig, no_ai: bool) -> Result<Option<OpenAiClient>> {
    if no_ai {
        return Ok(None);
    }
    let Some(key) = api_key_from_env(&config.openai.api_key_env) else {
        info!(
            var = %config.openai.api_key_env,
            "OpenAI API key not set, using headline digests"
        );
        return Ok(None);
    };
    Ok(Some(OpenAiClient::new(OpenAiConfig::from_app_config(config, key)?)?))
}

fn match_options(config: &AppConfig, max_articles: Option<usize>) -> Result<MatchOptions> {
    let defaults = MatchOptions::from(config);
    Ok(match max_articles {
        Some(n) => MatchOptions {
            max_articles: MatchOptions::new(n)?.max_articles,
            ..defaults
        },
        None => defaults,
    })
}

async fn fetch_event(gamma: &GammaClient, slug: &str) -> Result<Event> {
    gamma
        .event_by_slug(slug)
        .await?
        .ok_or_else(|| eyre!("no event found with slug '{slug}'"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_events(config: &AppConfig, limit: u32, format: OutputFormat) -> Result<()> {
    let events = gamma_client(config)?
        .list_events(&EventQuery::top_by_volume(limit))
        .await?;
    output::print_events(&events, format)
}

async fn cmd_search(
    config: &AppConfig,
    text: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    if text.trim().is_empty() {
        return Err(eyre!("search text must not be empty"));
    }
    let events = gamma_client(config)?.search_events(text.trim(), limit).await?;
    output::print_events(&events, format)
}

async fn cmd_match(
    config: &AppConfig,
    slug: &str,
    max_articles: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let opts = match_options(config, max_articles)?;
    let news = news_client(config)?;
    let event = fetch_event(&gamma_client(config)?, slug).await?;

    info!(slug, max_articles = opts.max_articles, "matching event");
    let matcher = Matcher::from_config(&news, config);
    let outcome = matcher.match_event_detailed(&event, &opts).await?;
    output::print_match(&event, &outcome, format)
}

async fn cmd_brief(
    config: &AppConfig,
    slug: &str,
    max_articles: Option<usize>,
    no_ai: bool,
    format: OutputFormat,
) -> Result<()> {
    let opts = match_options(config, max_articles)?;
    let news = news_client(config)?;
    let openai = openai_client(config, no_ai)?;
    let event = fetch_event(&gamma_client(config)?, slug).await?;

    let matcher = Matcher::from_config(&news, config);
    let summarizer = Summarizer::new(
        openai.as_ref().map(|c| c as &dyn Completion),
        SummarizerConfig::from(config),
    );

    info!(slug, ai = openai.is_some(), "briefing event");
    let brief = if format == OutputFormat::Text {
        let reporter = CliProgress::new();
        let result =
            brief_event_with_progress(&event, &matcher, &summarizer, &opts, &reporter).await;
        reporter.spinner.finish_and_clear();
        result?
    } else {
        brief_event(&event, &matcher, &summarizer, &opts).await?
    };
    output::print_brief(&event, &brief, format)
}

async fn cmd_digest(
    config: AppConfig,
    limit: u32,
    concurrency: usize,
    max_articles: Option<usize>,
    no_ai: bool,
    format: OutputFormat,
) -> Result<()> {
    if concurrency == 0 {
        return Err(eyre!("--concurrency must be at least 1"));
    }
    let opts = match_options(&config, max_articles)?;
    let news = Arc::new(news_client(&config)?);
    let openai = openai_client(&config, no_ai)?.map(Arc::new);
    let events = gamma_client(&config)?
        .list_events(&EventQuery::top_by_volume(limit))
        .await?;
    let config = Arc::new(config);

    info!(events = events.len(), concurrency, "starting digest");
    let bar = digest_bar(events.len() as u64, format);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(events.len());

    for event in events {
        let news = news.clone();
        let openai = openai.clone();
        let config = config.clone();
        let sem = semaphore.clone();
        let opts = opts.clone();
        let bar = bar.clone();

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await;

            let matcher = Matcher::from_config(news.as_ref(), &config);
            let summarizer = Summarizer::new(
                openai.as_deref().map(|c| c as &dyn Completion),
                SummarizerConfig::from(config.as_ref()),
            );
            let result = brief_event(&event, &matcher, &summarizer, &opts).await;
            bar.inc(1);
            (event, result)
        }));
    }

    let mut entries = Vec::with_capacity(handles.len());
    for handle in handles {
        let (event, result) = handle.await?;
        entries.push(digest_entry(event, result));
    }
    bar.finish_and_clear();

    output::print_digest(&entries, format)
}

fn digest_entry(
    event: Event,
    result: std::result::Result<EventBrief, UpstreamError>,
) -> DigestEntry {
    match result {
        Ok(brief) => DigestEntry {
            slug: event.slug,
            title: event.title,
            brief: Some(brief),
            error: None,
        },
        Err(e) => {
            warn!(slug = %event.slug, error = %e, "could not brief event");
            DigestEntry {
                slug: event.slug,
                title: event.title,
                brief: None,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn cmd_health(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let gamma = gamma_client(config)?;
    let gamma_status = match gamma.list_events(&EventQuery::top_by_volume(1)).await {
        Ok(_) => ServiceHealth {
            service: "gamma",
            status: "ok",
            detail: None,
        },
        Err(e) => ServiceHealth {
            service: "gamma",
            status: "degraded",
            detail: Some(e.to_string()),
        },
    };

    let news_status = match api_key_from_env(&config.newsapi.api_key_env) {
        None => ServiceHealth {
            service: "newsapi",
            status: "not_configured",
            detail: Some(format!("set {}", config.newsapi.api_key_env)),
        },
        Some(_) => match news_client(config)?.top_headlines("us", 1).await {
            Ok(_) => ServiceHealth {
                service: "newsapi",
                status: "ok",
                detail: None,
            },
            Err(e) => ServiceHealth {
                service: "newsapi",
                status: "degraded",
                detail: Some(e.to_string()),
            },
        },
    };

    // Completions cost money, so only key presence is checked.
    let openai_status = match openai_client(config, false)? {
        Some(client) => ServiceHealth {
            service: "openai",
            status: "ok",
            detail: Some(format!("model {}", client.model())),
        },
        None => ServiceHealth {
            service: "openai",
            status: "not_configured",
            detail: Some("headline digests only".into()),
        },
    };

    output::print_health(&[gamma_status, news_status, openai_status], format)
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    init_config_at(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporting
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn matched(&self, candidates: usize, kept: usize) {
        self.spinner
            .set_message(format!("Kept {kept} of {candidates} articles"));
    }

    fn done(&self, _brief: &EventBrief) {
        self.spinner.finish_and_clear();
    }
}

/// Progress bar over digest events; hidden for JSON output.
fn digest_bar(len: u64, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] briefing events")
    {
        bar.set_style(style);
    }
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}
