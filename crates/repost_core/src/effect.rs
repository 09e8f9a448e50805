use crate::{HistoryEntry, PipelineError, PublishPayload, RunId, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ParseLink { run: RunId, url: String },
    Fetch { run: RunId, post_id: String },
    Rewrite { run: RunId, title: String, body: String },
    PreparePublish { run: RunId, payload: PublishPayload },
    AppendHistory { run: RunId, entry: HistoryEntry },
    RunFailed {
        run: RunId,
        stage: Stage,
        error: PipelineError,
    },
    RunAbandoned { run: RunId, stage: Stage },
    Discarded(Discard),
}

/// Why a message left the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// The message is not valid in the current stage.
    NotAllowed { action: &'static str, stage: Stage },
    /// A stage result arrived for a run or stage that is no longer active.
    Stale { run: RunId, action: &'static str },
}
