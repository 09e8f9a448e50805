use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PublishPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Completed,
    Draft,
}

/// Summary of one finished pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub source_url: String,
    pub post_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub image_count: usize,
    pub created_at: DateTime<Utc>,
    pub status: EntryStatus,
}

impl HistoryEntry {
    /// Builds a completed entry with a fresh identifier.
    pub fn completed(payload: &PublishPayload, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_url: payload.source_url.clone(),
            post_id: payload.post_id.clone(),
            title: payload.title.clone(),
            body: payload.body.clone(),
            tags: payload.tags.clone(),
            image_count: payload.images.len(),
            created_at,
            status: EntryStatus::Completed,
        }
    }
}
