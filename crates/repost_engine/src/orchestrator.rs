use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use engine_logging::{Level, PipelineLog};

use repost_core::{
    parse_link, update, Discard, Effect, ErrorKind, HistoryEntry, Msg, PipelineError,
    PipelineState, PipelineView, PublishPayload, RunId, ScrapedContent, Stage,
};

use crate::fetch::{fetch_with_timeout, ContentFetcher};
use crate::history::{HistoryError, HistoryLog};
use crate::publish::{PublishReceipt, PublishTarget};
use crate::rewrite::{RewriteOutcome, Rewriter};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{action} is not allowed while the pipeline is {stage}")]
    NotAllowed { action: &'static str, stage: Stage },
    #[error("run {run} was reset or replaced before {action} arrived")]
    Superseded { run: RunId, action: &'static str },
    #[error(transparent)]
    Failed(PipelineError),
    #[error("could not record history: {0}")]
    History(#[from] HistoryError),
}

impl From<Discard> for StepError {
    fn from(discard: Discard) -> Self {
        match discard {
            Discard::NotAllowed { action, stage } => StepError::NotAllowed { action, stage },
            Discard::Stale { run, action } => StepError::Superseded { run, action },
        }
    }
}

/// Result of publish preparation. A failed delivery does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub payload: PublishPayload,
    pub delivery: Result<PublishReceipt, PipelineError>,
}

/// Backends the orchestrator runs effects against, chosen once at startup.
pub struct Collaborators {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub rewriter: Arc<Rewriter>,
    pub history: Arc<dyn HistoryLog>,
    pub publisher: Arc<dyn PublishTarget>,
    pub log: Arc<dyn PipelineLog>,
}

#[derive(Default)]
struct StepOutput {
    rewrite: Option<RewriteOutcome>,
    publish: Option<PublishReport>,
    entry: Option<HistoryEntry>,
    history_failure: Option<HistoryError>,
}

/// Drives one pipeline at a time.
///
/// State lives behind a mutex that is only held while `update` runs, never
/// across an await. Results of slow stages come back tagged with their run,
/// so a result that lands after a reset or a new submit is discarded.
pub struct Orchestrator {
    state: Mutex<PipelineState>,
    fetcher: Arc<dyn ContentFetcher>,
    rewriter: Arc<Rewriter>,
    history: Arc<dyn HistoryLog>,
    publisher: Arc<dyn PublishTarget>,
    log: Arc<dyn PipelineLog>,
    fetch_timeout: Duration,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, fetch_timeout: Duration) -> Self {
        let Collaborators {
            fetcher,
            rewriter,
            history,
            publisher,
            log,
        } = collaborators;
        Self {
            state: Mutex::new(PipelineState::new()),
            fetcher,
            rewriter,
            history,
            publisher,
            log,
            fetch_timeout,
        }
    }

    /// Parses and fetches `url`. On success the pipeline waits in `Ready`.
    pub async fn submit(&self, url: &str) -> Result<PipelineView, StepError> {
        self.execute(Msg::Submit {
            url: url.to_string(),
        })
        .await?;
        Ok(self.view())
    }

    /// Produces a fresh rewrite, replacing any earlier one.
    pub async fn request_rewrite(&self) -> Result<RewriteOutcome, StepError> {
        let output = self.execute(Msg::RewriteRequested).await?;
        output.rewrite.ok_or_else(|| self.not_allowed("rewrite"))
    }

    /// Builds the publish payload from the current content and delivers it.
    pub async fn proceed(&self) -> Result<PublishReport, StepError> {
        let output = self.execute(Msg::ProceedRequested).await?;
        output.publish.ok_or_else(|| self.not_allowed("proceed"))
    }

    /// Records the run in history and completes it. If the history log refuses
    /// the entry, the run stays in publish-prep and finalize may be retried.
    pub async fn finalize(&self) -> Result<HistoryEntry, StepError> {
        let output = self.execute(Msg::Finalize { at: Utc::now() }).await?;
        output.entry.ok_or_else(|| self.not_allowed("finalize"))
    }

    /// Abandons the current run. In-flight stage results are discarded when they land.
    pub fn reset(&self) -> PipelineView {
        for effect in self.dispatch(Msg::Reset) {
            if let Effect::RunAbandoned { run, stage } = effect {
                self.log.log(
                    Level::Info,
                    "run abandoned",
                    &[("run", run.to_string()), ("stage", stage.to_string())],
                );
            }
        }
        self.view()
    }

    pub fn view(&self) -> PipelineView {
        self.lock().view()
    }

    pub fn stage(&self) -> Stage {
        self.lock().stage()
    }

    /// True once after any state change.
    pub fn consume_dirty(&self) -> bool {
        self.lock().consume_dirty()
    }

    /// Reads the current state under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&PipelineState) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = self.lock();
        let state = std::mem::take(&mut *guard);
        let (state, effects) = update(state, msg);
        *guard = state;
        effects
    }

    fn not_allowed(&self, action: &'static str) -> StepError {
        StepError::NotAllowed {
            action,
            stage: self.stage(),
        }
    }

    async fn execute(&self, msg: Msg) -> Result<StepOutput, StepError> {
        let mut output = StepOutput::default();
        let mut pending = VecDeque::from([msg]);

        while let Some(msg) = pending.pop_front() {
            for effect in self.dispatch(msg) {
                match effect {
                    Effect::ParseLink { run, url } => {
                        let result = parse_link(&url).map_err(PipelineError::from);
                        if let Ok(link) = &result {
                            self.log.log(
                                Level::Debug,
                                "link parsed",
                                &[
                                    ("run", run.to_string()),
                                    ("post_id", link.post_id.clone()),
                                    ("link_type", link.link_type.to_string()),
                                ],
                            );
                        }
                        pending.push_back(Msg::LinkParsed { run, result });
                    }
                    Effect::Fetch { run, post_id } => {
                        let result = self.fetch(run, &post_id).await;
                        pending.push_back(Msg::FetchCompleted { run, result });
                    }
                    Effect::Rewrite { run, title, body } => {
                        let outcome = self.rewriter.rewrite(&title, &body).await;
                        pending.push_back(Msg::RewriteCompleted {
                            run,
                            content: outcome.content.clone(),
                        });
                        output.rewrite = Some(outcome);
                    }
                    Effect::PreparePublish { run, payload } => {
                        let delivery = self.deliver(run, &payload).await;
                        output.publish = Some(PublishReport { payload, delivery });
                    }
                    Effect::AppendHistory { run, entry } => {
                        match self.history.append(entry.clone()) {
                            Ok(()) => {
                                self.log.log(
                                    Level::Info,
                                    "run completed",
                                    &[
                                        ("run", run.to_string()),
                                        ("entry", entry.id.clone()),
                                        ("post_id", entry.post_id.clone()),
                                    ],
                                );
                                output.entry = Some(entry);
                                pending.push_back(Msg::HistoryRecorded {
                                    run,
                                    recorded: true,
                                });
                            }
                            Err(err) => {
                                self.log.log(
                                    Level::Error,
                                    "history append failed",
                                    &[
                                        ("run", run.to_string()),
                                        ("entry", entry.id.clone()),
                                        ("error", err.to_string()),
                                    ],
                                );
                                output.history_failure = Some(err);
                                pending.push_back(Msg::HistoryRecorded {
                                    run,
                                    recorded: false,
                                });
                            }
                        }
                    }
                    Effect::RunFailed { run, stage, error } => {
                        self.log.log(
                            Level::Error,
                            "run failed",
                            &[
                                ("run", run.to_string()),
                                ("stage", stage.to_string()),
                                ("kind", error.kind.to_string()),
                                ("reason", error.message.clone()),
                                ("tracking_id", error.tracking_id.to_string()),
                            ],
                        );
                        return Err(StepError::Failed(error));
                    }
                    Effect::RunAbandoned { run, stage } => {
                        self.log.log(
                            Level::Info,
                            "run abandoned",
                            &[("run", run.to_string()), ("stage", stage.to_string())],
                        );
                    }
                    Effect::Discarded(discard) => {
                        let (level, message) = match &discard {
                            Discard::Stale { .. } => (Level::Info, "late stage result discarded"),
                            Discard::NotAllowed { .. } => (Level::Warn, "action not allowed"),
                        };
                        let err = StepError::from(discard);
                        self.log.log(level, message, &[("detail", err.to_string())]);
                        return Err(err);
                    }
                }
            }
        }
        match output.history_failure.take() {
            Some(err) => Err(err.into()),
            None => Ok(output),
        }
    }

    async fn fetch(&self, run: RunId, post_id: &str) -> Result<ScrapedContent, PipelineError> {
        match fetch_with_timeout(self.fetcher.as_ref(), post_id, self.fetch_timeout).await {
            Ok(content) => {
                self.log.log(
                    Level::Info,
                    "post fetched",
                    &[
                        ("run", run.to_string()),
                        ("post_id", post_id.to_string()),
                        ("images", content.images().len().to_string()),
                    ],
                );
                Ok(content)
            }
            Err(err) => {
                let retryable = err.is_retryable();
                let error = PipelineError::from(err);
                self.log.log(
                    Level::Debug,
                    "fetch attempt failed",
                    &[
                        ("run", run.to_string()),
                        ("post_id", post_id.to_string()),
                        ("retryable", retryable.to_string()),
                        ("tracking_id", error.tracking_id.to_string()),
                    ],
                );
                Err(error)
            }
        }
    }

    async fn deliver(
        &self,
        run: RunId,
        payload: &PublishPayload,
    ) -> Result<PublishReceipt, PipelineError> {
        match self.publisher.deliver(payload).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                let error = PipelineError::new(ErrorKind::PublishPrepFailed, err.to_string());
                self.log.log(
                    Level::Warn,
                    "publish preparation failed",
                    &[
                        ("run", run.to_string()),
                        ("reason", error.message.clone()),
                        ("tracking_id", error.tracking_id.to_string()),
                    ],
                );
                Err(error)
            }
        }
    }
}
