use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Glyphs chat apps commonly append around shared links.
const DECORATIVE_GLYPHS: &[char] = &['😆', '🎉', '🔥', '💕', '✨'];

const EXPLORE_BASE: &str = "https://www.xiaohongshu.com/explore/";

static STANDARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xiaohongshu\.com/explore/([a-zA-Z0-9]+)").unwrap());
static SHARE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xiaohongshu\.com/discovery/item/([a-zA-Z0-9]+)").unwrap());
static SHORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xhslink\.com/([a-zA-Z0-9]+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Standard,
    Share,
    Short,
}

impl LinkType {
    /// Patterns in match priority order.
    const PRIORITY: [LinkType; 3] = [LinkType::Standard, LinkType::Share, LinkType::Short];

    fn pattern(self) -> &'static Regex {
        match self {
            LinkType::Standard => &STANDARD_PATTERN,
            LinkType::Share => &SHARE_PATTERN,
            LinkType::Short => &SHORT_PATTERN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Standard => "standard",
            LinkType::Share => "share",
            LinkType::Short => "short",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLink {
    pub post_id: String,
    /// The cleaned input the identifier was captured from.
    pub original_url: String,
    pub link_type: LinkType,
}

impl ParsedLink {
    /// The standard explore page for this post.
    ///
    /// `None` for [`LinkType::Short`]: the captured code is not a post id and
    /// short links are not resolved.
    pub fn canonical_url(&self) -> Option<Url> {
        if self.link_type == LinkType::Short {
            return None;
        }
        Url::parse(EXPLORE_BASE)
            .and_then(|base| base.join(&self.post_id))
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("link must not be empty")]
    Empty,
    #[error("unsupported link format: {input}")]
    Unrecognized { input: String },
}

/// Strips decorative glyphs and collapses whitespace runs to single spaces.
pub fn clean_url(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !DECORATIVE_GLYPHS.contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classifies `raw` into a post identifier.
///
/// Patterns are tried standard, then share, then short; the first hit wins.
pub fn parse_link(raw: &str) -> Result<ParsedLink, LinkError> {
    if raw.is_empty() {
        return Err(LinkError::Empty);
    }
    let cleaned = clean_url(raw);
    if cleaned.is_empty() {
        return Err(LinkError::Empty);
    }

    match match_link(&cleaned) {
        Some((link_type, post_id)) => Ok(ParsedLink {
            post_id,
            original_url: cleaned,
            link_type,
        }),
        None => Err(LinkError::Unrecognized { input: cleaned }),
    }
}

/// Same matching as [`parse_link`] without producing an error.
pub fn is_valid_link(raw: &str) -> bool {
    !raw.is_empty() && match_link(&clean_url(raw)).is_some()
}

pub fn validate_links(raw: &[&str]) -> Vec<bool> {
    raw.iter().map(|url| is_valid_link(url)).collect()
}

/// Parses every link, stopping at the first one that fails.
pub fn parse_links(raw: &[&str]) -> Result<Vec<ParsedLink>, LinkError> {
    raw.iter().map(|url| parse_link(url)).collect()
}

fn match_link(cleaned: &str) -> Option<(LinkType, String)> {
    LinkType::PRIORITY.iter().find_map(|&link_type| {
        link_type
            .pattern()
            .captures(cleaned)
            .and_then(|caps| caps.get(1))
            .map(|id| (link_type, id.as_str().to_string()))
    })
}
