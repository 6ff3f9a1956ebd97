//! Polymarket Gamma API client: prediction-market events and their markets.

mod wire;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

use marketlens_shared::{AppConfig, Event, MarketLensError, Result};

use wire::EventsEnvelope;

/// User-Agent string for Gamma requests.
const USER_AGENT: &str = concat!("MarketLens/", env!("CARGO_PKG_VERSION"));

/// Events fetched when filtering client-side in [`GammaClient::search_events`].
const SEARCH_POOL_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GammaConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl GammaConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let section = &config.gamma;
        let base_url = Url::parse(&section.base_url).map_err(|e| {
            MarketLensError::config(format!("invalid gamma.base_url {}: {e}", section.base_url))
        })?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(section.timeout_secs),
        })
    }
}

/// Filters and ordering for [`GammaClient::list_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub limit: u32,
    pub offset: u32,
    pub active: bool,
    pub closed: bool,
    /// Sort field: `volume`, `startDate`, `endDate`...
    pub order: String,
    pub ascending: bool,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            active: true,
            closed: false,
            order: "volume".into(),
            ascending: false,
        }
    }
}

impl EventQuery {
    /// Active, open events by descending volume.
    pub fn top_by_volume(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("active", self.active.to_string()),
            ("closed", self.closed.to_string()),
            ("order", self.order.clone()),
            ("ascending", self.ascending.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Gamma API HTTP client.
#[derive(Debug, Clone)]
pub struct GammaClient {
    client: Client,
    base_url: Url,
}

impl GammaClient {
    pub fn new(config: GammaConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketLensError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// Events matching `query`.
    #[instrument(skip_all, fields(limit = query.limit, offset = query.offset))]
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let events = self.fetch_events(&query.params()).await?;
        info!(count = events.len(), "fetched events");
        Ok(events)
    }

    /// The event with `slug`, or `None` if Gamma doesn't know it.
    #[instrument(skip(self))]
    pub async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        match self.fetch_events(&[("slug", slug.to_string())]).await {
            Ok(events) => Ok(events.into_iter().next()),
            Err(FetchError::Status(status))
                if status == StatusCode::NOT_FOUND
                    || status == StatusCode::UNPROCESSABLE_ENTITY =>
            {
                debug!("event not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Active events whose title, description, or tags contain `needle`
    /// (case-insensitive), filtered client-side.
    #[instrument(skip(self))]
    pub async fn search_events(&self, needle: &str, limit: usize) -> Result<Vec<Event>> {
        let needle = needle.to_lowercase();
        let pool = self
            .list_events(&EventQuery::top_by_volume(SEARCH_POOL_SIZE))
            .await?;
        Ok(pool
            .into_iter()
            .filter(|e| {
                let haystack =
                    format!("{} {} {}", e.title, e.description, e.tags.join(" ")).to_lowercase();
                haystack.contains(&needle)
            })
            .take(limit)
            .collect())
    }

    async fn fetch_events(
        &self,
        params: &[(&str, String)],
    ) -> std::result::Result<Vec<Event>, FetchError> {
        let url = format!("{}/events", self.base_url.as_str().trim_end_matches('/'));
        debug!(%url, "requesting");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let envelope: EventsEnvelope =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(envelope.into_events())
    }
}

/// Request failure, kept distinct so `event_by_slug` can treat 404 as absence.
#[derive(Debug)]
enum FetchError {
    Status(StatusCode),
    Transport(String),
    Decode(String),
}

impl From<FetchError> for MarketLensError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status(status) => MarketLensError::Network(format!("gamma: HTTP {status}")),
            FetchError::Transport(msg) => MarketLensError::Network(format!("gamma: {msg}")),
            FetchError::Decode(msg) => MarketLensError::parse(format!("gamma response: {msg}")),
        }
    }
}
