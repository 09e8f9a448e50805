use std::path::{Path, PathBuf};

use repost_core::{PublishPayload, PUBLISH_DEEP_LINK};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("could not write publish payload: {0}")]
    Persist(#[from] PersistError),
    #[error("publish target unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Where the payload text landed, if the target writes files.
    pub location: Option<PathBuf>,
    pub deep_link: String,
}

/// Hands a finished payload to the user's publishing flow.
#[async_trait::async_trait]
pub trait PublishTarget: Send + Sync {
    async fn deliver(&self, payload: &PublishPayload) -> Result<PublishReceipt, PublishError>;
}

/// Writes `payload.txt` and `images.txt` into a directory.
#[derive(Debug, Clone)]
pub struct OutboxTarget {
    dir: PathBuf,
}

impl OutboxTarget {
    pub const TEXT_FILE: &'static str = "payload.txt";
    pub const IMAGES_FILE: &'static str = "images.txt";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl PublishTarget for OutboxTarget {
    async fn deliver(&self, payload: &PublishPayload) -> Result<PublishReceipt, PublishError> {
        let writer = AtomicFileWriter::new(self.dir.clone());
        let mut images = payload.images.join("\n");
        if !images.is_empty() {
            images.push('\n');
        }
        let text_path = writer.write(Self::TEXT_FILE, &payload.text)?;
        writer.write(Self::IMAGES_FILE, &images)?;
        Ok(PublishReceipt {
            location: Some(text_path),
            deep_link: PUBLISH_DEEP_LINK.to_string(),
        })
    }
}
