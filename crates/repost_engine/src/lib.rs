//! Repost engine: the IO side of the pipeline.
//!
//! Backends sit behind traits ([`ContentFetcher`], [`RewriteBackend`],
//! [`GenerativeClient`], [`HistoryLog`], [`PublishTarget`]) and are wired
//! into an [`Orchestrator`] once, usually from an [`EngineConfig`].
mod config;
mod envelope;
mod fetch;
mod generative;
mod history;
mod orchestrator;
mod persist;
mod publish;
mod rewrite;

pub use config::{ConfigError, EngineConfig, RewriteMode, RewriteSettings};
pub use fetch::{
    fetch_with_timeout, ContentFetcher, FetchError, FetchFailure, FetchSettings,
    FixtureContentFetcher, HttpContentFetcher,
};
pub use generative::{
    ChatCompletionClient, GenerativeClient, GenerativeError, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use history::{HistoryError, HistoryLog, JsonlHistory, MemoryHistory};
pub use orchestrator::{Collaborators, Orchestrator, PublishReport, StepError};
pub use persist::{append_line, ensure_output_dir, AtomicFileWriter, PersistError};
pub use publish::{OutboxTarget, PublishError, PublishReceipt, PublishTarget};
pub use rewrite::{
    build_prompt, parse_rewrite_response, DisabledRewriteBackend, FixtureRewriteBackend,
    GenerativeRewriteBackend, RewriteBackend, RewriteError, RewriteOutcome, RewriteServiceBackend,
    RewriteSource, Rewriter,
};
