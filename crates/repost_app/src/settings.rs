use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use repost_engine::{EngineConfig, RewriteMode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "repost.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Everything the binary reads from `repost.ron`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub engine: EngineConfig,
    pub log: LogSettings,
}

impl AppSettings {
    /// Reads `explicit` if given, else `repost.ron` when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Applies `REPOST_*` variables as returned by `lookup` and returns the
    /// names that were set. Runs before the logger exists, so callers log them.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<&'static str>> {
        let mut applied = Vec::new();
        if let Some(key) = lookup("REPOST_API_KEY") {
            self.engine.rewrite.api_key = Some(key);
            applied.push("REPOST_API_KEY");
        }
        if let Some(endpoint) = lookup("REPOST_FETCH_ENDPOINT") {
            self.engine.fetch.endpoint = Some(endpoint);
            applied.push("REPOST_FETCH_ENDPOINT");
        }
        if let Some(mode) = lookup("REPOST_REWRITE_MODE") {
            self.engine.rewrite.mode = mode
                .parse::<RewriteMode>()
                .context("REPOST_REWRITE_MODE")?;
            applied.push("REPOST_REWRITE_MODE");
        }
        if let Some(level) = lookup("REPOST_LOG") {
            self.log.level = level;
            applied.push("REPOST_LOG");
        }
        Ok(applied)
    }
}
