//! OpenAI chat-completions client implementing the [`Completion`] capability.
//!
//! One call is one HTTP request: no retries, no streaming. Every failure is
//! reported as a [`ProviderError`], which the summarizer absorbs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use marketlens_shared::{
    AppConfig, Completion, CompletionBudget, MarketLensError, Prompt, ProviderError, Result,
};

/// User-Agent string for OpenAI requests.
const USER_AGENT: &str = concat!("MarketLens/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`ProviderError::Http`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
}

impl OpenAiConfig {
    /// Build from the `[openai]` config section and a resolved API key.
    pub fn from_app_config(config: &AppConfig, api_key: impl Into<String>) -> Result<Self> {
        let section = &config.openai;
        let base_url = Url::parse(&section.base_url).map_err(|e| {
            MarketLensError::config(format!("invalid openai.base_url {}: {e}", section.base_url))
        })?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            model: section.model.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// OpenAI chat-completions HTTP client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketLensError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Completion for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(
        &self,
        prompt: &Prompt,
        budget: &CompletionBudget,
    ) -> std::result::Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: budget.temperature,
            max_tokens: budget.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .timeout(budget.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        after: budget.timeout,
                    }
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(format!("invalid chat response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("chat response has no content".into()))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
