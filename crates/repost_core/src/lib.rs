//! Repost core: link parsing, content rules and the pipeline state machine.
//!
//! Nothing in this crate performs IO. The engine crate runs the [`Effect`]s
//! that [`update`] returns and feeds the results back as [`Msg`]s.
mod content;
mod effect;
mod error;
mod history;
mod link;
mod msg;
mod publish;
mod state;
mod update;
mod validate;
mod view_model;

pub use content::{
    normalize_text, IncompleteContent, RewriteCandidate, RewrittenContent, ScrapedContent,
    ScrapedRecord, FALLBACK_SUBSTITUTIONS, FALLBACK_TAGS,
};
pub use effect::{Discard, Effect};
pub use error::{ErrorKind, PipelineError, TrackingId};
pub use history::{EntryStatus, HistoryEntry};
pub use link::{
    clean_url, is_valid_link, parse_link, parse_links, validate_links, LinkError, LinkType,
    ParsedLink,
};
pub use msg::Msg;
pub use publish::{format_for_publish, PublishPayload, PUBLISH_DEEP_LINK};
pub use state::{Phase, PipelineState, RunId, Stage};
pub use update::update;
pub use validate::{ContentLimits, ContentValidator, Denylist, ValidationResult, REDACTION_MASK};
pub use view_model::{FailureView, PipelineView};
