use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use repost_core::{ErrorKind, PipelineError, ScrapedContent, ScrapedRecord};

use crate::envelope::Envelope;

/// Upstream status the scrape service quotes in its error text, e.g. "HTTP 403: ...".
static UPSTREAM_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bHTTP (\d{3})\b").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Scrape service URL. Without one the fixture backend is used.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Network,
    HttpStatus(u16),
    /// Anti-bot interstitial, an HTML page or a 403.
    Challenge,
    TooLarge { max_bytes: u64 },
    MalformedPayload,
    Rejected,
    Incomplete,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timeout"),
            FetchFailure::Network => write!(f, "network error"),
            FetchFailure::HttpStatus(429) => write!(f, "rate limited (http 429)"),
            FetchFailure::HttpStatus(code) => write!(f, "http status {code}"),
            FetchFailure::Challenge => write!(f, "blocked by access challenge"),
            FetchFailure::TooLarge { max_bytes } => {
                write!(f, "response larger than {max_bytes} bytes")
            }
            FetchFailure::MalformedPayload => write!(f, "malformed payload"),
            FetchFailure::Rejected => write!(f, "rejected by scrape service"),
            FetchFailure::Incomplete => write!(f, "incomplete content"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchFailure,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether trying again later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FetchFailure::Timeout | FetchFailure::Network => true,
            FetchFailure::HttpStatus(code) => code == 429 || (500..600).contains(&code),
            _ => false,
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self.kind {
            FetchFailure::Timeout => ErrorKind::FetchTimeout,
            FetchFailure::Incomplete => ErrorKind::IncompleteContent,
            _ => ErrorKind::FetchFailed,
        }
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        PipelineError::new(err.error_kind(), err.to_string())
    }
}

#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, post_id: &str) -> Result<ScrapedContent, FetchError>;
}

/// Runs `fetcher` under `timeout`, whatever bounds the backend applies itself.
pub async fn fetch_with_timeout(
    fetcher: &dyn ContentFetcher,
    post_id: &str,
    timeout: Duration,
) -> Result<ScrapedContent, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(post_id)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::new(
            FetchFailure::Timeout,
            format!("no content within {} ms", timeout.as_millis()),
        )),
    }
}

/// Client for the scrape service: POSTs `{"postId": ...}` and expects an envelope.
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    max_bytes: u64,
}

impl HttpContentFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let endpoint = settings.endpoint.as_deref().ok_or_else(|| {
            FetchError::new(FetchFailure::Network, "no scrape endpoint configured")
        })?;
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|err| FetchError::new(FetchFailure::Network, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .map_err(|err| FetchError::new(FetchFailure::Network, err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            max_bytes: settings.max_bytes,
        })
    }

    /// Error text from a failure envelope, with the service's tracking id if it sent one.
    async fn service_error(&self, response: reqwest::Response) -> Option<String> {
        let bytes = self.read_body(response).await.ok()?;
        let envelope: Envelope<serde_json::Value> = serde_json::from_slice(&bytes).ok()?;
        let message = envelope.error?;
        Some(match envelope.tracking_id {
            Some(id) => format!("{message} (service tracking id {id})"),
            None => message,
        })
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let too_large = || {
            FetchError::new(
                FetchFailure::TooLarge {
                    max_bytes: self.max_bytes,
                },
                "response too large",
            )
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, post_id: &str) -> Result<ScrapedContent, FetchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "postId": post_id }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let content_type = content_type(&response);
        if !status.is_success() {
            let service_error = match content_type.as_deref() {
                Some(ct) if ct.contains("json") => self.service_error(response).await,
                _ => None,
            };
            return Err(classify_status(status, service_error));
        }

        if let Some(ct) = content_type.as_deref() {
            if !ct.contains("json") {
                return Err(FetchError::new(
                    FetchFailure::Challenge,
                    format!("expected json, got {ct}"),
                ));
            }
        }

        let bytes = self.read_body(response).await?;
        let envelope: Envelope<ScrapedRecord> = serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FetchFailure::MalformedPayload, err.to_string()))?;
        let record = envelope
            .into_result()
            .map_err(|message| FetchError::new(FetchFailure::Rejected, message))?;

        ScrapedContent::from_record(post_id, record, Utc::now())
            .map_err(|err| FetchError::new(FetchFailure::Incomplete, err.to_string()))
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase())
}

/// Classifies a non-2xx answer. The scrape service reports upstream failures
/// as a 500 whose envelope quotes the upstream status, so that status wins
/// over the outer one when present.
fn classify_status(status: StatusCode, service_error: Option<String>) -> FetchError {
    let Some(message) = service_error else {
        let kind = if status == StatusCode::FORBIDDEN {
            FetchFailure::Challenge
        } else {
            FetchFailure::HttpStatus(status.as_u16())
        };
        return FetchError::new(kind, status.to_string());
    };
    let upstream = UPSTREAM_STATUS
        .captures(&message)
        .and_then(|caps| caps[1].parse::<u16>().ok());
    let kind = match upstream {
        Some(403) => FetchFailure::Challenge,
        Some(code @ (429 | 500..=599)) => FetchFailure::HttpStatus(code),
        Some(_) => FetchFailure::Rejected,
        None if status == StatusCode::FORBIDDEN => FetchFailure::Challenge,
        None => FetchFailure::HttpStatus(status.as_u16()),
    };
    FetchError::new(kind, message)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FetchFailure::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FetchFailure::MalformedPayload, err.to_string());
    }
    FetchError::new(FetchFailure::Network, err.to_string())
}

/// Serves canned records by post id, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureContentFetcher {
    records: HashMap<String, ScrapedRecord>,
    fallback: Option<ScrapedRecord>,
    delay: Option<Duration>,
}

impl FixtureContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every id with a generic sample post.
    pub fn sample() -> Self {
        Self::new().with_default(ScrapedRecord {
            title: "这是一个原始标题".to_string(),
            content: "这是原始的文案内容，分享一下最近发现的好物。\n\n用了一周，体验很不错。"
                .to_string(),
            images: vec![
                "https://picsum.photos/seed/repost-1/800/1000".to_string(),
                "https://picsum.photos/seed/repost-2/800/1000".to_string(),
                "https://picsum.photos/seed/repost-3/800/1000".to_string(),
            ],
            ..ScrapedRecord::default()
        })
    }

    pub fn with_record(mut self, record: ScrapedRecord) -> Self {
        self.records.insert(record.post_id.clone(), record);
        self
    }

    /// Record used for ids without their own entry; its post id is replaced.
    pub fn with_default(mut self, record: ScrapedRecord) -> Self {
        self.fallback = Some(record);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl ContentFetcher for FixtureContentFetcher {
    async fn fetch(&self, post_id: &str) -> Result<ScrapedContent, FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let record = match (self.records.get(post_id), &self.fallback) {
            (Some(record), _) => record.clone(),
            (None, Some(template)) => ScrapedRecord {
                post_id: post_id.to_string(),
                ..template.clone()
            },
            (None, None) => {
                return Err(FetchError::new(
                    FetchFailure::Rejected,
                    format!("no fixture for post {post_id}"),
                ))
            }
        };
        ScrapedContent::from_record(post_id, record, Utc::now())
            .map_err(|err| FetchError::new(FetchFailure::Incomplete, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_status, FetchError, FetchFailure};
    use repost_core::ErrorKind;
    use reqwest::StatusCode;

    #[test]
    fn retryable_classes() {
        let retryable = |kind| FetchError::new(kind, "").is_retryable();
        assert!(retryable(FetchFailure::Timeout));
        assert!(retryable(FetchFailure::Network));
        assert!(retryable(FetchFailure::HttpStatus(503)));
        assert!(retryable(FetchFailure::HttpStatus(429)));
        assert!(!retryable(FetchFailure::HttpStatus(404)));
        assert!(!retryable(FetchFailure::Challenge));
        assert!(!retryable(FetchFailure::Incomplete));
    }

    #[test]
    fn failures_map_onto_pipeline_kinds() {
        let kind = |kind| FetchError::new(kind, "").error_kind();
        assert_eq!(kind(FetchFailure::Timeout), ErrorKind::FetchTimeout);
        assert_eq!(kind(FetchFailure::Incomplete), ErrorKind::IncompleteContent);
        assert_eq!(kind(FetchFailure::Rejected), ErrorKind::FetchFailed);
        assert_eq!(kind(FetchFailure::HttpStatus(500)), ErrorKind::FetchFailed);
    }

    #[test]
    fn quoted_upstream_status_wins_over_outer_status() {
        let classify = |message: &str| {
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, Some(message.to_string())).kind
        };
        assert_eq!(classify("HTTP 403: 无法访问小红书"), FetchFailure::Challenge);
        assert_eq!(classify("HTTP 404: 无法访问小红书"), FetchFailure::Rejected);
        assert_eq!(classify("HTTP 502: 无法访问小红书"), FetchFailure::HttpStatus(502));
        assert_eq!(classify("未找到帖子数据"), FetchFailure::HttpStatus(500));
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, None).kind,
            FetchFailure::HttpStatus(502)
        );
    }
}
