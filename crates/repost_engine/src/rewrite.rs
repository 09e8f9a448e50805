use std::sync::{Arc, LazyLock};
use std::time::Duration;

use engine_logging::{Level, PipelineLog};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use repost_core::{
    ContentValidator, ErrorKind, PipelineError, RewriteCandidate, RewrittenContent,
};

use crate::envelope::Envelope;
use crate::generative::{GenerativeClient, GenerativeError};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)\r?\n?[ \t]*```").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("could not parse rewrite response: {0}")]
    Parse(String),
    #[error("rewrite failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("rewrite timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("rewrite transport failed: {0}")]
    Transport(String),
    #[error("rewrite unavailable: {0}")]
    Unavailable(String),
}

impl RewriteError {
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            RewriteError::Parse(_) => ErrorKind::RewriteParseFailed,
            RewriteError::Validation(_) => ErrorKind::RewriteValidationFailed,
            RewriteError::Timeout(_)
            | RewriteError::Transport(_)
            | RewriteError::Unavailable(_) => ErrorKind::RewriteUnavailable,
        }
    }
}

impl From<RewriteError> for PipelineError {
    fn from(err: RewriteError) -> Self {
        PipelineError::new(err.error_kind(), err.to_string())
    }
}

impl From<GenerativeError> for RewriteError {
    fn from(err: GenerativeError) -> Self {
        match err {
            GenerativeError::Config(msg) => RewriteError::Unavailable(msg),
            GenerativeError::Empty => RewriteError::Parse(err.to_string()),
            other => RewriteError::Transport(other.to_string()),
        }
    }
}

/// Produces an unchecked rewrite for a title and body.
#[async_trait::async_trait]
pub trait RewriteBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn rewrite(&self, title: &str, body: &str) -> Result<RewriteCandidate, RewriteError>;
}

pub fn build_prompt(title: &str, body: &str) -> String {
    format!(
        "请改写下面这篇小红书笔记，保持原意，让表达更自然、更有吸引力，\
并给出3到5个话题标签。\n\n\
原标题：{title}\n\n\
原正文：\n{body}\n\n\
只返回一个JSON对象，格式如下：\n\
{{\"title\": \"新标题\", \"content\": \"新正文\", \"tags\": [\"标签1\", \"标签2\", \"标签3\"]}}"
    )
}

/// Extracts a candidate from model output.
///
/// Tried in order: the whole text as JSON, the first fenced block, then the
/// span from the first `{` to the last `}`.
pub fn parse_rewrite_response(text: &str) -> Result<RewriteCandidate, RewriteError> {
    let trimmed = text.trim();
    if let Ok(candidate) = serde_json::from_str::<RewriteCandidate>(trimmed) {
        return Ok(candidate);
    }

    if let Some(block) = FENCED_BLOCK.captures(trimmed).and_then(|caps| caps.get(1)) {
        if let Ok(candidate) = serde_json::from_str::<RewriteCandidate>(block.as_str().trim()) {
            return Ok(candidate);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(candidate) = serde_json::from_str::<RewriteCandidate>(&trimmed[start..=end])
            {
                return Ok(candidate);
            }
        }
    }

    Err(RewriteError::Parse(format!(
        "no JSON object in {} characters of output",
        trimmed.chars().count()
    )))
}

/// Prompts a generative model and parses its answer.
pub struct GenerativeRewriteBackend {
    client: Arc<dyn GenerativeClient>,
    model: String,
}

impl GenerativeRewriteBackend {
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl RewriteBackend for GenerativeRewriteBackend {
    fn name(&self) -> &'static str {
        "generative"
    }

    async fn rewrite(&self, title: &str, body: &str) -> Result<RewriteCandidate, RewriteError> {
        let prompt = build_prompt(title, body);
        let text = self.client.complete(&self.model, &prompt).await?;
        parse_rewrite_response(&text)
    }
}

/// Dedicated rewrite service: POSTs `{title, content}` and expects an envelope.
pub struct RewriteServiceBackend {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl RewriteServiceBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RewriteError> {
        let endpoint =
            reqwest::Url::parse(endpoint).map_err(|e| RewriteError::Unavailable(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RewriteError::Unavailable(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait::async_trait]
impl RewriteBackend for RewriteServiceBackend {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn rewrite(&self, title: &str, body: &str) -> Result<RewriteCandidate, RewriteError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "title": title, "content": body }))
            .send()
            .await
            .map_err(|e| RewriteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RewriteError::Transport(status.to_string()));
        }
        let text = response
            .text()
            .await
            .map_err(|e| RewriteError::Transport(e.to_string()))?;
        let envelope: Envelope<RewriteCandidate> =
            serde_json::from_str(&text).map_err(|e| RewriteError::Parse(e.to_string()))?;
        envelope.into_result().map_err(RewriteError::Unavailable)
    }
}

/// Answers with a fixed candidate, or echoes the input when none is set.
#[derive(Debug, Clone, Default)]
pub struct FixtureRewriteBackend {
    candidate: Option<RewriteCandidate>,
    delay: Option<Duration>,
}

impl FixtureRewriteBackend {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn returning(candidate: RewriteCandidate) -> Self {
        Self {
            candidate: Some(candidate),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl RewriteBackend for FixtureRewriteBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn rewrite(&self, title: &str, body: &str) -> Result<RewriteCandidate, RewriteError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.candidate.clone().unwrap_or_else(|| RewriteCandidate {
            title: title.to_string(),
            content: body.to_string(),
            tags: vec!["生活".to_string(), "笔记".to_string()],
        }))
    }
}

/// Always unavailable; every rewrite takes the local path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRewriteBackend;

#[async_trait::async_trait]
impl RewriteBackend for DisabledRewriteBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn rewrite(&self, _title: &str, _body: &str) -> Result<RewriteCandidate, RewriteError> {
        Err(RewriteError::Unavailable("remote rewriting is disabled".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteSource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub content: RewrittenContent,
    pub source: RewriteSource,
    /// Why the remote path was abandoned, when it was.
    pub diagnostic: Option<PipelineError>,
}

/// Remote rewrite with a local fallback. Never fails.
pub struct Rewriter {
    backend: Arc<dyn RewriteBackend>,
    validator: ContentValidator,
    timeout: Duration,
    log: Arc<dyn PipelineLog>,
}

impl Rewriter {
    pub fn new(
        backend: Arc<dyn RewriteBackend>,
        validator: ContentValidator,
        timeout: Duration,
        log: Arc<dyn PipelineLog>,
    ) -> Self {
        Self {
            backend,
            validator,
            timeout,
            log,
        }
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    pub async fn rewrite(&self, title: &str, body: &str) -> RewriteOutcome {
        match self.try_remote(title, body).await {
            Ok(content) => {
                self.log.log(
                    Level::Info,
                    "remote rewrite accepted",
                    &[
                        ("backend", self.backend.name().to_string()),
                        ("tags", content.tags().len().to_string()),
                    ],
                );
                RewriteOutcome {
                    content,
                    source: RewriteSource::Remote,
                    diagnostic: None,
                }
            }
            Err(err) => {
                let error = PipelineError::from(err);
                self.log.log(
                    Level::Warn,
                    "remote rewrite abandoned, using local fallback",
                    &[
                        ("backend", self.backend.name().to_string()),
                        ("kind", error.kind.to_string()),
                        ("reason", error.message.clone()),
                        ("tracking_id", error.tracking_id.to_string()),
                    ],
                );
                RewriteOutcome {
                    content: RewrittenContent::fallback(title, body, &self.validator),
                    source: RewriteSource::Fallback,
                    diagnostic: Some(error),
                }
            }
        }
    }

    async fn try_remote(&self, title: &str, body: &str) -> Result<RewrittenContent, RewriteError> {
        let candidate = tokio::time::timeout(self.timeout, self.backend.rewrite(title, body))
            .await
            .map_err(|_| RewriteError::Timeout(self.timeout))??;
        RewrittenContent::validated(candidate, title, body, &self.validator)
            .map_err(|result| RewriteError::Validation(result.errors))
    }
}
