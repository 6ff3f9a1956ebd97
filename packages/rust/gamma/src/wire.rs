//! Gamma API payloads and their conversion into domain [`Event`]s.
//!
//! The API is loose about types: ids and volumes arrive as strings or
//! numbers, `outcomes` / `outcomePrices` as JSON arrays or as strings holding
//! an encoded array, and tags as objects or bare labels.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use marketlens_shared::{Event, Market};

/// `/events` answers with a bare array or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EventsEnvelope {
    List(Vec<WireEvent>),
    Wrapped {
        #[serde(default, alias = "data")]
        events: Vec<WireEvent>,
    },
}

impl EventsEnvelope {
    pub fn into_events(self) -> Vec<Event> {
        let wire = match self {
            Self::List(events) | Self::Wrapped { events } => events,
        };
        wire.into_iter().map(WireEvent::into_event).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Num(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Num(n) => n.to_string(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        let value: Option<f64> = match self {
            Self::Str(s) => s.trim().parse().ok(),
            Self::Num(n) => n.as_f64(),
        };
        value.filter(|v| v.is_finite())
    }
}

/// A JSON array, or a string containing one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listish {
    List(Vec<Scalar>),
    Encoded(String),
}

impl Listish {
    fn into_scalars(self) -> Option<Vec<Scalar>> {
        match self {
            Self::List(items) => Some(items),
            Self::Encoded(s) if s.trim().is_empty() => Some(Vec::new()),
            Self::Encoded(s) => serde_json::from_str(&s).ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTag {
    Object {
        #[serde(default)]
        label: Option<String>,
    },
    Label(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEvent {
    #[serde(default)]
    id: Option<Scalar>,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    tags: Vec<WireTag>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    volume: Option<Scalar>,
    /// Decoded one by one so a single bad market doesn't lose the event.
    #[serde(default)]
    markets: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMarket {
    #[serde(default)]
    id: Option<Scalar>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    outcomes: Option<Listish>,
    #[serde(default)]
    outcome_prices: Option<Listish>,
    #[serde(default)]
    volume_num: Option<Scalar>,
    #[serde(default)]
    volume: Option<Scalar>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
}

impl WireEvent {
    pub fn into_event(self) -> Event {
        let markets = self
            .markets
            .into_iter()
            .filter_map(|value| {
                let decoded = serde_json::from_value::<WireMarket>(value)
                    .ok()
                    .and_then(WireMarket::into_market);
                if decoded.is_none() {
                    debug!(event = %self.slug, "skipping undecodable market");
                }
                decoded
            })
            .collect();

        let tags = self
            .tags
            .into_iter()
            .filter_map(|tag| match tag {
                WireTag::Object { label } => label,
                WireTag::Label(label) => Some(label),
            })
            .filter(|t| !t.trim().is_empty())
            .collect();

        let mut event = Event::new(self.slug, self.title);
        if let Some(id) = self.id {
            event.id = id.into_string();
        }
        event.description = self.description.unwrap_or_default();
        event.category = self.category.filter(|c| !c.trim().is_empty());
        event.tags = tags;
        event.markets = markets;
        event.start_date = self.start_date.as_deref().and_then(parse_date);
        event.end_date = self.end_date.as_deref().and_then(parse_date);
        event.volume = self.volume.as_ref().and_then(Scalar::as_f64).unwrap_or(0.0);
        event.active = self.active.unwrap_or(false);
        event.closed = self.closed.unwrap_or(false);
        event
    }
}

impl WireMarket {
    fn into_market(self) -> Option<Market> {
        let outcomes = self
            .outcomes
            .map_or(Some(Vec::new()), Listish::into_scalars)?
            .into_iter()
            .map(Scalar::into_string)
            .collect();
        let prices = self
            .outcome_prices
            .map_or(Some(Vec::new()), Listish::into_scalars)?
            .iter()
            .map(Scalar::as_f64)
            .collect::<Option<Vec<f64>>>()?;

        let id = self.id.map(Scalar::into_string).unwrap_or_default();
        let mut market = Market::new(id, self.question, outcomes, prices).ok()?;
        market.slug = self.slug;
        market.volume = self
            .volume_num
            .as_ref()
            .and_then(Scalar::as_f64)
            .or_else(|| self.volume.as_ref().and_then(Scalar::as_f64))
            .unwrap_or(0.0);
        market.active = self.active.unwrap_or(false);
        market.closed = self.closed.unwrap_or(false);
        Some(market)
    }
}

/// RFC 3339 timestamp or bare `YYYY-MM-DD` (midnight UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
