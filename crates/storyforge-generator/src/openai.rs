//! `NarrativeGenerator` over an OpenAI-compatible `chat/completions` API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storyforge_core::error::DomainError;
use storyforge_core::generator::NarrativeGenerator;
use tracing::{debug, instrument};

use crate::error::GeneratorError;
use crate::prompt::{STORY_SYSTEM_PROMPT, user_message};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// API base used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base, without the `/chat/completions` suffix.
    pub base_url: String,
}

impl OpenAiConfig {
    /// Settings for the public OpenAI API with the default model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Generates story descriptions with a single chat-completions call.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGenerator {
    /// Creates a generator with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::Config` if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GeneratorError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Sends the story prompt for `theme` and returns the raw reply text.
    ///
    /// # Errors
    ///
    /// Returns a `GeneratorError` if the request fails, the endpoint
    /// answers with a non-success status, or the reply has no content.
    pub async fn complete(&self, theme: &str) -> Result<String, GeneratorError> {
        let user = user_message(theme);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: STORY_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;
        let content = extract_content(&body)?;
        debug!(bytes = content.len(), "generator replied");
        Ok(content)
    }
}

fn extract_content(body: &str) -> Result<String, GeneratorError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| GeneratorError::Parse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GeneratorError::EmptyResponse)
}

#[async_trait]
impl NarrativeGenerator for OpenAiGenerator {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn generate(&self, theme: &str) -> Result<String, DomainError> {
        Ok(self.complete(theme).await?)
    }
}
