use crate::{ErrorKind, LinkType, RunId, Stage};

/// Snapshot of the pipeline for rendering by a calling surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineView {
    pub stage: Stage,
    pub run: Option<RunId>,
    pub post_id: Option<String>,
    pub link_type: Option<LinkType>,
    /// Rewritten title when one exists, otherwise the original.
    pub title: Option<String>,
    pub rewritten: bool,
    pub tags: Vec<String>,
    pub image_count: usize,
    pub failure: Option<FailureView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureView {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    pub tracking_id: String,
}
