use crate::{
    Discard, Effect, HistoryEntry, Msg, Phase, PipelineError, PipelineState, PublishPayload,
    RunId, Stage,
};

/// Applies a message to state and returns the effects the caller must run.
///
/// Stage results carry the run they belong to; a result for any run or stage
/// other than the active one is discarded without touching state.
pub fn update(mut state: PipelineState, msg: Msg) -> (PipelineState, Vec<Effect>) {
    let action = msg.action();
    let phase = state.take_phase();

    let effects = match (phase, msg) {
        (Phase::Idle, Msg::Reset) => {
            state.restore_phase(Phase::Idle);
            Vec::new()
        }
        (phase, Msg::Reset) => {
            let stage = phase.stage();
            let run = phase.run();
            state.set_phase(Phase::Idle);
            match run {
                Some(run) if !matches!(stage, Stage::Completed | Stage::Failed) => {
                    vec![Effect::RunAbandoned { run, stage }]
                }
                _ => Vec::new(),
            }
        }

        (Phase::Idle, Msg::Submit { url }) => {
            let run = state.allocate_run();
            state.set_phase(Phase::Parsing {
                run,
                url: url.clone(),
            });
            vec![Effect::ParseLink { run, url }]
        }

        (Phase::Parsing { run, .. }, Msg::LinkParsed { run: done, result }) if run == done => {
            match result {
                Ok(link) => {
                    let post_id = link.post_id.clone();
                    state.set_phase(Phase::Fetching { run, link });
                    vec![Effect::Fetch { run, post_id }]
                }
                Err(error) => fail(&mut state, run, Stage::Parsing, error),
            }
        }

        (Phase::Fetching { run, link }, Msg::FetchCompleted { run: done, result })
            if run == done =>
        {
            match result {
                Ok(original) => {
                    state.set_phase(Phase::Ready {
                        run,
                        link,
                        original,
                        rewritten: None,
                    });
                    Vec::new()
                }
                Err(error) => fail(&mut state, run, Stage::Fetching, error),
            }
        }

        (
            Phase::Ready {
                run,
                link,
                original,
                rewritten: _previous,
            },
            Msg::RewriteRequested,
        ) => {
            let title = original.title().to_string();
            let body = original.body().to_string();
            state.set_phase(Phase::Rewriting {
                run,
                link,
                original,
            });
            vec![Effect::Rewrite { run, title, body }]
        }

        (
            Phase::Rewriting {
                run,
                link,
                original,
            },
            Msg::RewriteCompleted { run: done, content },
        ) if run == done => {
            state.set_phase(Phase::Ready {
                run,
                link,
                original,
                rewritten: Some(content),
            });
            Vec::new()
        }

        (
            Phase::Ready {
                run,
                link,
                original,
                rewritten,
            },
            Msg::ProceedRequested,
        ) => {
            let payload = match &rewritten {
                Some(content) => {
                    PublishPayload::from_rewritten(&original, content, &link.original_url)
                }
                None => PublishPayload::from_original(&original, &link.original_url),
            };
            state.set_phase(Phase::PublishPrep {
                run,
                link,
                original,
                rewritten,
                payload: payload.clone(),
                recording: None,
            });
            vec![Effect::PreparePublish { run, payload }]
        }

        (
            Phase::PublishPrep {
                run,
                link,
                original,
                rewritten,
                payload,
                recording: None,
            },
            Msg::Finalize { at },
        ) => {
            let entry = HistoryEntry::completed(&payload, at);
            state.restore_phase(Phase::PublishPrep {
                run,
                link,
                original,
                rewritten,
                payload,
                recording: Some(entry.clone()),
            });
            vec![Effect::AppendHistory { run, entry }]
        }

        (
            Phase::PublishPrep {
                run,
                link,
                original,
                rewritten,
                payload,
                recording: Some(entry),
            },
            Msg::HistoryRecorded {
                run: done,
                recorded,
            },
        ) if run == done => {
            if recorded {
                state.set_phase(Phase::Completed { run, entry });
            } else {
                // Stay in publish-prep so finalize can be retried.
                state.restore_phase(Phase::PublishPrep {
                    run,
                    link,
                    original,
                    rewritten,
                    payload,
                    recording: None,
                });
            }
            Vec::new()
        }

        (phase, msg) => {
            let discard = match stage_result_run(&msg) {
                Some(run) => Discard::Stale { run, action },
                None => Discard::NotAllowed {
                    action,
                    stage: phase.stage(),
                },
            };
            state.restore_phase(phase);
            vec![Effect::Discarded(discard)]
        }
    };

    (state, effects)
}

fn fail(
    state: &mut PipelineState,
    run: RunId,
    stage: Stage,
    error: PipelineError,
) -> Vec<Effect> {
    state.set_phase(Phase::Failed {
        run,
        stage,
        error: error.clone(),
    });
    vec![Effect::RunFailed { run, stage, error }]
}

fn stage_result_run(msg: &Msg) -> Option<RunId> {
    match msg {
        Msg::LinkParsed { run, .. }
        | Msg::FetchCompleted { run, .. }
        | Msg::RewriteCompleted { run, .. }
        | Msg::HistoryRecorded { run, .. } => Some(*run),
        _ => None,
    }
}
