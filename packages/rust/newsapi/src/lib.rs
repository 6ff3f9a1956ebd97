//! NewsAPI.org client implementing the [`NewsSearch`] capability.
//!
//! Searches `/everything` for an event's query within its time window, and
//! exposes `/top-headlines` for connectivity checks.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use marketlens_shared::{
    AppConfig, Article, MarketLensError, NewsSearch, Result, TimeWindow, UpstreamError,
};

use wire::ApiResponse;

/// NewsAPI caps `pageSize` at this value.
const MAX_PAGE_SIZE: u32 = 100;

/// Longest error body kept in an [`UpstreamError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// User-Agent string for NewsAPI requests.
const USER_AGENT: &str = concat!("MarketLens/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and query settings for [`NewsApiClient`].
#[derive(Debug, Clone)]
pub struct NewsApiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub language: String,
    pub sort_by: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl NewsApiConfig {
    /// Build from the `[newsapi]` config section and a resolved API key.
    pub fn from_app_config(config: &AppConfig, api_key: impl Into<String>) -> Result<Self> {
        let section = &config.newsapi;
        let base_url = Url::parse(&section.base_url).map_err(|e| {
            MarketLensError::config(format!("invalid newsapi.base_url {}: {e}", section.base_url))
        })?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            language: section.language.clone(),
            sort_by: section.sort_by.clone(),
            page_size: section.page_size.clamp(1, MAX_PAGE_SIZE),
            timeout: Duration::from_secs(section.timeout_secs),
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Usable articles in provider order.
    pub articles: Vec<Article>,
    /// Total matches NewsAPI reports for the query.
    pub total_results: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// NewsAPI.org HTTP client.
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    config: NewsApiConfig,
}

impl NewsApiClient {
    pub fn new(config: NewsApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketLensError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Search `/everything` for `query` within `window`.
    #[instrument(skip_all, fields(query = %query, window = %window))]
    pub async fn search_everything(
        &self,
        query: &str,
        window: &TimeWindow,
    ) -> std::result::Result<SearchPage, UpstreamError> {
        let params = [
            ("q", query.to_string()),
            ("from", window.start().format("%Y-%m-%d").to_string()),
            ("to", window.end().format("%Y-%m-%d").to_string()),
            ("language", self.config.language.clone()),
            ("sortBy", self.config.sort_by.clone()),
            ("pageSize", self.config.page_size.to_string()),
        ];
        let page = self.get("everything", &params).await?;
        info!(
            returned = page.articles.len(),
            total = page.total_results,
            "news search complete"
        );
        Ok(page)
    }

    /// Current top headlines for a two-letter `country` code.
    #[instrument(skip(self))]
    pub async fn top_headlines(
        &self,
        country: &str,
        page_size: u32,
    ) -> std::result::Result<Vec<Article>, UpstreamError> {
        let params = [
            ("country", country.to_string()),
            ("pageSize", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        Ok(self.get("top-headlines", &params).await?.articles)
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<SearchPage, UpstreamError> {
        let url = endpoint_url(&self.config.base_url, endpoint);
        debug!(%url, "requesting");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.config.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        if parsed.status != "ok" {
            return Err(UpstreamError::Api {
                code: parsed.code.unwrap_or_else(|| parsed.status.clone()),
                message: parsed.message.unwrap_or_else(|| "unknown error".into()),
            });
        }

        let received = parsed.articles.len();
        let articles: Vec<Article> = parsed
            .articles
            .into_iter()
            .filter_map(wire::WireArticle::into_article)
            .collect();
        if articles.len() < received {
            debug!(skipped = received - articles.len(), "dropped unusable articles");
        }

        Ok(SearchPage {
            articles,
            total_results: parsed.total_results,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                after: self.config.timeout,
            }
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl NewsSearch for NewsApiClient {
    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
    ) -> std::result::Result<Vec<Article>, UpstreamError> {
        // NewsAPI rejects an empty `q`; nothing can match it anyway.
        if query.trim().is_empty() {
            debug!("empty query, skipping news search");
            return Ok(Vec::new());
        }
        Ok(self.search_everything(query, window).await?.articles)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn endpoint_url(base: &Url, endpoint: &str) -> String {
    format!("{}/{endpoint}", base.as_str().trim_end_matches('/'))
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> NewsApiClient {
        let mut app = AppConfig::default();
        app.newsapi.base_url = format!("{}/v2", server.uri());
        app.newsapi.timeout_secs = 5;
        NewsApiClient::new(NewsApiConfig::from_app_config(&app, "test-key").unwrap()).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 10, 4, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 4, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn search_sends_query_and_filters_articles() {
        let server = MockServer::start().await;
        let body = std::fs::read_to_string("../../../fixtures/json/newsapi_everything.json")
            .expect("read newsapi fixture");

        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(header("X-Api-Key", "test-key"))
            .and(query_param("q", "Fed December rate"))
            .and(query_param("from", "2025-10-04"))
            .and(query_param("to", "2025-12-04"))
            .and(query_param("language", "en"))
            .and(query_param("sortBy", "relevancy"))
            .and(query_param("pageSize", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server)
            .search_everything("Fed December rate", &window())
            .await
            .unwrap();

        assert_eq!(page.total_results, 4);
        let urls: Vec<&str> = page.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://www.reuters.com/markets/fed-december",
                "https://marketpulse.example/powell"
            ]
        );
        assert!(!page.articles[0].content.as_deref().unwrap().contains("chars]"));
    }

    #[tokio::test]
    async fn http_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server).search("Fed", &window()).await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Http {
                status: 429,
                body: "rate limited".into()
            }
        );
    }

    #[tokio::test]
    async fn error_status_in_payload_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status": "error", "code": "maximumResultsReached", "message": "Too many results"}"#,
            ))
            .mount(&server)
            .await;

        let err = client(&server).search("Fed", &window()).await.unwrap_err();
        assert!(
            matches!(err, UpstreamError::Api { ref code, .. } if code == "maximumResultsReached")
        );
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"status": "ok", "totalResults": 0, "articles": []}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut config = client(&server).config;
        config.timeout = Duration::from_millis(100);
        let news = NewsApiClient::new(config).unwrap();

        let err = news.search("Fed", &window()).await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Timeout {
                after: Duration::from_millis(100)
            }
        );
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).search("Fed", &window()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_query_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let found = client(&server).search("  ", &window()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn top_headlines_by_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .and(query_param("country", "us"))
            .and(query_param("pageSize", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status": "ok", "totalResults": 1, "articles": [
                    {"source": {"name": "AP"}, "title": "Headline", "url": "https://ap.example/1",
                     "publishedAt": "2025-11-20T10:00:00Z"}]}"#,
            ))
            .mount(&server)
            .await;

        let articles = client(&server).top_headlines("us", 1).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_name, "AP");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let mut app = AppConfig::default();
        app.newsapi.base_url = "not a url".into();
        let err = NewsApiConfig::from_app_config(&app, "k").unwrap_err();
        assert!(matches!(err, MarketLensError::Config { .. }));
    }
}
