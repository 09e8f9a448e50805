use serde::{Deserialize, Serialize};

use crate::{RewrittenContent, ScrapedContent};

/// Deep link that opens the app's compose screen.
pub const PUBLISH_DEEP_LINK: &str = "xhsdiscover://publish";

/// Body, a blank line, then the tags as space-separated `#tag` tokens.
pub fn format_for_publish(content: &RewrittenContent) -> String {
    let tags = content
        .tags()
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}\n\n{}", content.body(), tags)
}

/// Everything the user needs to re-post by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub text: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub post_id: String,
    pub source_url: String,
}

impl PublishPayload {
    pub fn from_original(original: &ScrapedContent, source_url: &str) -> Self {
        Self {
            text: format!("{}\n\n{}", original.title(), original.body()),
            title: original.title().to_string(),
            body: original.body().to_string(),
            tags: Vec::new(),
            images: original.images().to_vec(),
            post_id: original.post_id().to_string(),
            source_url: source_url.to_string(),
        }
    }

    pub fn from_rewritten(
        original: &ScrapedContent,
        rewritten: &RewrittenContent,
        source_url: &str,
    ) -> Self {
        Self {
            text: format!("{}\n\n{}", rewritten.title(), format_for_publish(rewritten)),
            title: rewritten.title().to_string(),
            body: rewritten.body().to_string(),
            tags: rewritten.tags().to_vec(),
            images: original.images().to_vec(),
            post_id: original.post_id().to_string(),
            source_url: source_url.to_string(),
        }
    }
}
