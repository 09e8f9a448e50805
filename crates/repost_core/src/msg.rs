use chrono::{DateTime, Utc};

use crate::{ParsedLink, PipelineError, RewrittenContent, RunId, ScrapedContent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a link to start a new run.
    Submit { url: String },
    /// Link parsing finished for a run.
    LinkParsed {
        run: RunId,
        result: Result<ParsedLink, PipelineError>,
    },
    /// Fetch finished (or timed out) for a run.
    FetchCompleted {
        run: RunId,
        result: Result<ScrapedContent, PipelineError>,
    },
    /// User asked for a (re)generated rewrite.
    RewriteRequested,
    /// Rewriter produced content; it never fails outward.
    RewriteCompleted {
        run: RunId,
        content: RewrittenContent,
    },
    /// User chose to continue to publish preparation.
    ProceedRequested,
    /// User confirmed the prepared payload.
    Finalize { at: DateTime<Utc> },
    /// The history log confirmed (or refused) the entry written on finalize.
    HistoryRecorded { run: RunId, recorded: bool },
    /// Abandon the current run.
    Reset,
}

impl Msg {
    pub fn action(&self) -> &'static str {
        match self {
            Msg::Submit { .. } => "submit",
            Msg::LinkParsed { .. } => "link parsed",
            Msg::FetchCompleted { .. } => "fetch completed",
            Msg::RewriteRequested => "rewrite",
            Msg::RewriteCompleted { .. } => "rewrite completed",
            Msg::ProceedRequested => "proceed",
            Msg::Finalize { .. } => "finalize",
            Msg::HistoryRecorded { .. } => "history recorded",
            Msg::Reset => "reset",
        }
    }
}
