//! Structural and policy checks for post text.
//!
//! Hard failures land in `errors`, soft issues in `warnings`; a result can
//! carry both. Every check is a pure function of its inputs.

use serde::{Deserialize, Serialize};

pub const REDACTION_MASK: &str = "***";

const DEFAULT_TERMS: &[&str] = &[
    "政治", "赌博", "色情", "暴力", "毒品", "枪支", "诈骗", "传销",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Concatenates results, keeping argument order for errors and warnings.
    pub fn merge(results: impl IntoIterator<Item = ValidationResult>) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for result in results {
            errors.extend(result.errors);
            warnings.extend(result.warnings);
        }
        Self::from_parts(errors, warnings)
    }
}

/// Bounds applied by [`ContentValidator`]. Lengths count Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentLimits {
    pub title_max: usize,
    pub title_warn_below: usize,
    pub body_max: usize,
    pub body_warn_below: usize,
    pub tags_min: usize,
    pub tags_max: usize,
    pub tag_max: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            title_max: 50,
            title_warn_below: 5,
            body_max: 2000,
            body_warn_below: 20,
            tags_min: 1,
            tags_max: 10,
            tag_max: 20,
        }
    }
}

/// Disallowed terms, matched as case-sensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denylist {
    terms: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_TERMS.iter().copied())
    }
}

impl Denylist {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms = terms
            .into_iter()
            .map(Into::into)
            .filter(|term: &String| !term.is_empty())
            .collect();
        Self { terms }
    }

    pub fn empty() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Terms found in `text`, in list order.
    pub fn matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.terms
            .iter()
            .filter(|term| text.contains(term.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn redact(&self, text: &str) -> String {
        self.terms
            .iter()
            .fold(text.to_string(), |acc, term| acc.replace(term.as_str(), REDACTION_MASK))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentValidator {
    limits: ContentLimits,
    denylist: Denylist,
}

impl ContentValidator {
    pub fn new(limits: ContentLimits, denylist: Denylist) -> Self {
        Self { limits, denylist }
    }

    pub fn limits(&self) -> &ContentLimits {
        &self.limits
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    pub fn validate_title(&self, title: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let len = title.chars().count();

        if title.trim().is_empty() {
            errors.push("title must not be empty".to_string());
        }
        if len > self.limits.title_max {
            errors.push(format!(
                "title must not exceed {} characters",
                self.limits.title_max
            ));
        }
        if len < self.limits.title_warn_below {
            warnings.push(format!(
                "title is short; at least {} characters recommended",
                self.limits.title_warn_below
            ));
        }
        self.check_terms("title", title, &mut errors);

        ValidationResult::from_parts(errors, warnings)
    }

    pub fn validate_content(&self, body: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let len = body.chars().count();

        if body.trim().is_empty() {
            errors.push("content must not be empty".to_string());
        }
        if len > self.limits.body_max {
            errors.push(format!(
                "content must not exceed {} characters",
                self.limits.body_max
            ));
        }
        if len < self.limits.body_warn_below {
            warnings.push(format!(
                "content is short; at least {} characters recommended",
                self.limits.body_warn_below
            ));
        }
        self.check_terms("content", body, &mut errors);

        ValidationResult::from_parts(errors, warnings)
    }

    pub fn validate_tags<S: AsRef<str>>(&self, tags: &[S]) -> ValidationResult {
        let mut errors = Vec::new();

        if tags.len() < self.limits.tags_min {
            errors.push(format!(
                "at least {} tag(s) required",
                self.limits.tags_min
            ));
        }
        if tags.len() > self.limits.tags_max {
            errors.push(format!(
                "no more than {} tags allowed",
                self.limits.tags_max
            ));
        }
        for (idx, tag) in tags.iter().enumerate() {
            let tag = tag.as_ref();
            let field = format!("tag {}", idx + 1);
            if tag.trim().is_empty() {
                errors.push(format!("{field} must not be empty"));
            }
            if tag.chars().count() > self.limits.tag_max {
                errors.push(format!(
                    "{field} must not exceed {} characters",
                    self.limits.tag_max
                ));
            }
            self.check_terms(&field, tag, &mut errors);
        }

        ValidationResult::from_parts(errors, Vec::new())
    }

    /// Title, content and tag checks combined in that order.
    pub fn validate_all<S: AsRef<str>>(
        &self,
        title: &str,
        body: &str,
        tags: &[S],
    ) -> ValidationResult {
        ValidationResult::merge([
            self.validate_title(title),
            self.validate_content(body),
            self.validate_tags(tags),
        ])
    }

    /// Masks denylisted terms for display. Does not affect validity.
    pub fn clean_content(&self, text: &str) -> String {
        self.denylist.redact(text)
    }

    fn check_terms(&self, field: &str, text: &str, errors: &mut Vec<String>) {
        let found = self.denylist.matches(text);
        if !found.is_empty() {
            errors.push(format!(
                "{field} contains disallowed terms: {}",
                found.join(", ")
            ));
        }
    }
}
