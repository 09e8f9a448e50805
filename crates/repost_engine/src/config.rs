use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};

use repost_core::{ContentLimits, ContentValidator, Denylist, RewrittenContent};

use crate::fetch::{
    ContentFetcher, FetchError, FetchSettings, FixtureContentFetcher, HttpContentFetcher,
};
use crate::generative::{ChatCompletionClient, GenerativeError, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::history::JsonlHistory;
use crate::publish::OutboxTarget;
use crate::rewrite::{
    DisabledRewriteBackend, FixtureRewriteBackend, GenerativeRewriteBackend, RewriteBackend,
    RewriteError, RewriteServiceBackend,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fetch backend: {0}")]
    Fetch(#[from] FetchError),
    #[error("generative client: {0}")]
    Generative(#[from] GenerativeError),
    #[error("rewrite backend: {0}")]
    Rewrite(#[from] RewriteError),
    #[error("rewrite mode {0} requires an endpoint")]
    MissingEndpoint(RewriteMode),
    #[error("unknown rewrite mode {0:?}")]
    UnknownMode(String),
    #[error("content limits leave no valid local rewrite: {}", .0.join("; "))]
    UnsatisfiableLimits(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Chat completion service.
    #[default]
    Generative,
    /// Dedicated rewrite endpoint.
    Service,
    Fixture,
    Disabled,
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewriteMode::Generative => "generative",
            RewriteMode::Service => "service",
            RewriteMode::Fixture => "fixture",
            RewriteMode::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

impl FromStr for RewriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generative" => Ok(RewriteMode::Generative),
            "service" => Ok(RewriteMode::Service),
            "fixture" => Ok(RewriteMode::Fixture),
            "disabled" | "off" => Ok(RewriteMode::Disabled),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteSettings {
    pub mode: RewriteMode,
    /// Rewrite service URL for [`RewriteMode::Service`].
    pub endpoint: Option<String>,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            mode: RewriteMode::default(),
            endpoint: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            timeout_ms: 15_000,
        }
    }
}

impl RewriteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

const FALLBACK_SAMPLE: (&str, &str) = ("这是原始标题", "这是原始文案内容，分享一个好物。");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub rewrite: RewriteSettings,
    pub limits: ContentLimits,
    pub denylist: Denylist,
    pub history_path: PathBuf,
    pub outbox_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            rewrite: RewriteSettings::default(),
            limits: ContentLimits::default(),
            denylist: Denylist::default(),
            history_path: PathBuf::from("repost-history.jsonl"),
            outbox_dir: PathBuf::from("outbox"),
        }
    }
}

impl EngineConfig {
    /// Builds the validator, rejecting limits and denylists under which the
    /// local fallback rewrite could not pass validation.
    pub fn validator(&self) -> Result<ContentValidator, ConfigError> {
        let validator = ContentValidator::new(self.limits.clone(), self.denylist.clone());
        let mut errors = Vec::new();
        for (title, body) in [("", ""), (FALLBACK_SAMPLE.0, FALLBACK_SAMPLE.1)] {
            let fallback = RewrittenContent::fallback(title, body, &validator);
            let result =
                validator.validate_all(fallback.title(), fallback.body(), fallback.tags());
            for error in result.errors {
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
        }
        if errors.is_empty() {
            Ok(validator)
        } else {
            Err(ConfigError::UnsatisfiableLimits(errors))
        }
    }

    pub fn fetcher(&self) -> Result<Arc<dyn ContentFetcher>, ConfigError> {
        match self.fetch.endpoint {
            Some(_) => Ok(Arc::new(HttpContentFetcher::new(&self.fetch)?)),
            None => {
                engine_info!("No scrape endpoint configured; serving sample content");
                Ok(Arc::new(FixtureContentFetcher::sample()))
            }
        }
    }

    pub fn rewrite_backend(&self) -> Result<Arc<dyn RewriteBackend>, ConfigError> {
        let settings = &self.rewrite;
        let backend: Arc<dyn RewriteBackend> = match settings.mode {
            RewriteMode::Generative => match settings.api_key.as_deref() {
                Some(key) if !key.trim().is_empty() => {
                    let client = ChatCompletionClient::new(
                        key,
                        settings.base_url.clone(),
                        settings.temperature,
                        settings.timeout(),
                    )?;
                    Arc::new(GenerativeRewriteBackend::new(
                        Arc::new(client),
                        settings.model.clone(),
                    ))
                }
                _ => {
                    engine_warn!("No API key configured; rewrites will use the local fallback");
                    Arc::new(DisabledRewriteBackend)
                }
            },
            RewriteMode::Service => {
                let endpoint = settings
                    .endpoint
                    .as_deref()
                    .ok_or(ConfigError::MissingEndpoint(RewriteMode::Service))?;
                Arc::new(RewriteServiceBackend::new(endpoint, settings.timeout())?)
            }
            RewriteMode::Fixture => Arc::new(FixtureRewriteBackend::echo()),
            RewriteMode::Disabled => Arc::new(DisabledRewriteBackend),
        };
        Ok(backend)
    }

    pub fn history(&self) -> JsonlHistory {
        JsonlHistory::new(self.history_path.clone())
    }

    pub fn outbox(&self) -> OutboxTarget {
        OutboxTarget::new(self.outbox_dir.clone())
    }
}
