//! Client for OpenAI-compatible chat completion services.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_MODEL: &str = "glm-4-flash";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerativeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("service returned no completion")]
    Empty,
}

/// Turns a prompt into free-form text.
#[async_trait::async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, GenerativeError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// `POST {base_url}/chat/completions` with bearer authentication.
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    temperature: f32,
}

impl ChatCompletionClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, GenerativeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerativeError::Config("api key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerativeError::Config(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl GenerativeClient for ChatCompletionClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, GenerativeError> {
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerativeError::Timeout(e.to_string())
                } else {
                    GenerativeError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerativeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GenerativeError::Parse(e.to_string()))?;

        raw.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerativeError::Empty)
    }
}
