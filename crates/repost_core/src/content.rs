use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContentValidator, ValidationResult};

/// Substitutions applied by the local fallback rewrite, in order.
pub const FALLBACK_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("这是", "这里是"),
    ("原始", "初始"),
    ("内容", "素材"),
    ("标题", "题目"),
    ("文案", "文字"),
    ("分享", "推荐"),
    ("好物", "宝藏"),
];

pub const FALLBACK_TAGS: &[&str] = &["生活", "分享", "推荐"];

const UNTITLED: &str = "无标题";

/// A post record as delivered by a fetch backend, before any checks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record failed structural checks: {}", .problems.join("; "))]
pub struct IncompleteContent {
    pub problems: Vec<String>,
}

/// A fetched post. Title and body are non-empty, at least one image is present,
/// and the identifier matches the one it was requested under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedContent {
    title: String,
    body: String,
    images: Vec<String>,
    post_id: String,
    fetched_at: DateTime<Utc>,
}

impl ScrapedContent {
    pub fn from_record(
        expected_post_id: &str,
        record: ScrapedRecord,
        now: DateTime<Utc>,
    ) -> Result<Self, IncompleteContent> {
        let title = normalize_text(&record.title);
        let body = normalize_text(&record.content);
        let images: Vec<String> = record
            .images
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        let post_id = record.post_id.trim().to_string();

        let mut problems = Vec::new();
        if title.is_empty() {
            problems.push("missing title".to_string());
        }
        if body.is_empty() {
            problems.push("missing body".to_string());
        }
        if images.is_empty() {
            problems.push("no images".to_string());
        }
        if post_id.is_empty() {
            problems.push("missing post id".to_string());
        } else if post_id != expected_post_id {
            problems.push(format!(
                "post id {post_id} does not match requested {expected_post_id}"
            ));
        }
        if !problems.is_empty() {
            return Err(IncompleteContent { problems });
        }

        Ok(Self {
            title,
            body,
            images,
            post_id,
            fetched_at: record.scraped_at.unwrap_or(now),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Unchecked rewrite output as parsed from a remote service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewriteCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Rewritten post text. Only obtainable through [`RewrittenContent::validated`]
/// or [`RewrittenContent::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenContent {
    title: String,
    body: String,
    tags: Vec<String>,
    original_title: String,
    original_body: String,
}

impl RewrittenContent {
    /// Normalizes `candidate` and admits it only if it passes `validator`.
    pub fn validated(
        candidate: RewriteCandidate,
        original_title: &str,
        original_body: &str,
        validator: &ContentValidator,
    ) -> Result<Self, ValidationResult> {
        let title = candidate.title.trim().to_string();
        let body = candidate.content.trim().to_string();
        let tags = normalize_tags(candidate.tags);

        let result = validator.validate_all(&title, &body, &tags);
        if !result.valid {
            return Err(result);
        }
        Ok(Self {
            title,
            body,
            tags,
            original_title: original_title.to_string(),
            original_body: original_body.to_string(),
        })
    }

    /// Deterministic local rewrite: fixed substitutions, denylist redaction,
    /// placeholder for blank input, and truncation to the validator's maxima.
    /// Fallback tags that the validator would reject are dropped.
    pub fn fallback(title: &str, body: &str, validator: &ContentValidator) -> Self {
        let limits = validator.limits();
        let denylist = validator.denylist();

        let mut new_title = denylist.redact(&substitute(title)).trim().to_string();
        if new_title.is_empty() {
            new_title = denylist.redact(UNTITLED);
        }
        let new_title = truncate_chars(&new_title, limits.title_max);

        let mut new_body = denylist.redact(&substitute(body)).trim().to_string();
        if new_body.is_empty() {
            new_body = new_title.clone();
        }
        let new_body = truncate_chars(&new_body, limits.body_max);

        let tags = FALLBACK_TAGS
            .iter()
            .filter(|tag| tag.chars().count() <= limits.tag_max)
            .filter(|tag| denylist.matches(tag).is_empty())
            .take(limits.tags_max)
            .map(|tag| tag.to_string())
            .collect();

        Self {
            title: new_title,
            body: new_body,
            tags,
            original_title: title.to_string(),
            original_body: body.to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn original_title(&self) -> &str {
        &self.original_title
    }

    pub fn original_body(&self) -> &str {
        &self.original_body
    }
}

fn substitute(text: &str) -> String {
    FALLBACK_SUBSTITUTIONS
        .iter()
        .fold(text.to_string(), |acc, &(from, to)| acc.replace(from, to))
}

/// Trims, strips a leading `#`, and drops blanks and repeats.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Trims and limits blank-line runs to a single empty line.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.trim().chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else if ch != '\r' {
            newlines = 0;
        }
        if ch != '\r' {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, normalize_text, substitute, truncate_chars};

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(normalize_text("  a\n\n\n\nb\r\n c "), "a\n\nb\n c");
    }

    #[test]
    fn substitution_table_applies_in_order() {
        assert_eq!(substitute("这是原始内容"), "这里是初始素材");
    }

    #[test]
    fn tags_are_normalized() {
        let tags = vec![
            " #旅行".to_string(),
            "旅行".to_string(),
            "  ".to_string(),
            "美食".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["旅行", "美食"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("你好世界", 2), "你好");
    }
}
