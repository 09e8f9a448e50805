use std::fmt;

use crate::view_model::{FailureView, PipelineView};
use crate::{
    HistoryEntry, ParsedLink, PipelineError, PublishPayload, RewrittenContent, ScrapedContent,
};

pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Parsing,
    Fetching,
    Ready,
    Rewriting,
    PublishPrep,
    Completed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Parsing => "parsing",
            Stage::Fetching => "fetching",
            Stage::Ready => "ready",
            Stage::Rewriting => "rewriting",
            Stage::PublishPrep => "publish-prep",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The current run and whatever it has produced so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Parsing {
        run: RunId,
        url: String,
    },
    Fetching {
        run: RunId,
        link: ParsedLink,
    },
    Ready {
        run: RunId,
        link: ParsedLink,
        original: ScrapedContent,
        rewritten: Option<RewrittenContent>,
    },
    Rewriting {
        run: RunId,
        link: ParsedLink,
        original: ScrapedContent,
    },
    PublishPrep {
        run: RunId,
        link: ParsedLink,
        original: ScrapedContent,
        rewritten: Option<RewrittenContent>,
        payload: PublishPayload,
        /// Entry handed to the history log and not yet confirmed.
        recording: Option<HistoryEntry>,
    },
    Completed {
        run: RunId,
        entry: HistoryEntry,
    },
    Failed {
        run: RunId,
        stage: Stage,
        error: PipelineError,
    },
}

impl Phase {
    pub fn stage(&self) -> Stage {
        match self {
            Phase::Idle => Stage::Idle,
            Phase::Parsing { .. } => Stage::Parsing,
            Phase::Fetching { .. } => Stage::Fetching,
            Phase::Ready { .. } => Stage::Ready,
            Phase::Rewriting { .. } => Stage::Rewriting,
            Phase::PublishPrep { .. } => Stage::PublishPrep,
            Phase::Completed { .. } => Stage::Completed,
            Phase::Failed { .. } => Stage::Failed,
        }
    }

    pub fn run(&self) -> Option<RunId> {
        match self {
            Phase::Idle => None,
            Phase::Parsing { run, .. }
            | Phase::Fetching { run, .. }
            | Phase::Ready { run, .. }
            | Phase::Rewriting { run, .. }
            | Phase::PublishPrep { run, .. }
            | Phase::Completed { run, .. }
            | Phase::Failed { run, .. } => Some(*run),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    phase: Phase,
    next_run: RunId,
    dirty: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            next_run: 1,
            dirty: false,
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn stage(&self) -> Stage {
        self.phase.stage()
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.phase.run()
    }

    pub fn original(&self) -> Option<&ScrapedContent> {
        match &self.phase {
            Phase::Ready { original, .. }
            | Phase::Rewriting { original, .. }
            | Phase::PublishPrep { original, .. } => Some(original),
            _ => None,
        }
    }

    pub fn rewritten(&self) -> Option<&RewrittenContent> {
        match &self.phase {
            Phase::Ready { rewritten, .. } | Phase::PublishPrep { rewritten, .. } => {
                rewritten.as_ref()
            }
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&PublishPayload> {
        match &self.phase {
            Phase::PublishPrep { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.phase {
            Phase::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn view(&self) -> PipelineView {
        let link = match &self.phase {
            Phase::Fetching { link, .. }
            | Phase::Ready { link, .. }
            | Phase::Rewriting { link, .. }
            | Phase::PublishPrep { link, .. } => Some(link),
            _ => None,
        };
        let (title, image_count) = match (&self.phase, self.original()) {
            (Phase::Completed { entry, .. }, _) => (Some(entry.title.clone()), entry.image_count),
            (_, Some(original)) => (
                Some(
                    self.rewritten()
                        .map(|r| r.title().to_string())
                        .unwrap_or_else(|| original.title().to_string()),
                ),
                original.images().len(),
            ),
            _ => (None, 0),
        };
        let failure = match &self.phase {
            Phase::Failed { stage, error, .. } => Some(FailureView {
                stage: *stage,
                kind: error.kind,
                message: error.message.clone(),
                tracking_id: error.tracking_id.to_string(),
            }),
            _ => None,
        };

        PipelineView {
            stage: self.stage(),
            run: self.active_run(),
            post_id: link.map(|l| l.post_id.clone()),
            link_type: link.map(|l| l.link_type),
            title,
            rewritten: self.rewritten().is_some(),
            tags: self
                .rewritten()
                .map(|r| r.tags().to_vec())
                .unwrap_or_default(),
            image_count,
            failure,
            dirty: self.dirty,
        }
    }

    /// Returns whether the phase changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn take_phase(&mut self) -> Phase {
        std::mem::take(&mut self.phase)
    }

    pub(crate) fn restore_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.dirty = true;
    }

    pub(crate) fn allocate_run(&mut self) -> RunId {
        let run = self.next_run;
        self.next_run += 1;
        run
    }
}
