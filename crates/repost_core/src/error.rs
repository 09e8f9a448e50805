use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LinkError;

/// Correlation token minted when an error value is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidLinkFormat,
    FetchTimeout,
    FetchFailed,
    IncompleteContent,
    RewriteParseFailed,
    RewriteValidationFailed,
    /// The rewrite service timed out, was unreachable, or is not configured.
    RewriteUnavailable,
    PublishPrepFailed,
}

impl ErrorKind {
    /// Whether this kind ends the run it occurs in.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidLinkFormat
                | ErrorKind::FetchTimeout
                | ErrorKind::FetchFailed
                | ErrorKind::IncompleteContent
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidLinkFormat => "invalid link format",
            ErrorKind::FetchTimeout => "fetch timed out",
            ErrorKind::FetchFailed => "fetch failed",
            ErrorKind::IncompleteContent => "incomplete content",
            ErrorKind::RewriteParseFailed => "rewrite response unparseable",
            ErrorKind::RewriteValidationFailed => "rewrite failed validation",
            ErrorKind::RewriteUnavailable => "rewrite service unavailable",
            ErrorKind::PublishPrepFailed => "publish preparation failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message} (tracking id {tracking_id})")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
    pub tracking_id: TrackingId,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tracking_id: TrackingId::generate(),
        }
    }
}

impl From<LinkError> for PipelineError {
    fn from(err: LinkError) -> Self {
        PipelineError::new(ErrorKind::InvalidLinkFormat, err.to_string())
    }
}
