use crate::assemble::OutputArtifacts;
use crate::classify::ClassifiedLine;
use crate::job::JobRequest;
use crate::processor::PageText;

/// Accumulated state for one job run. Stage results are `Option` until the
/// corresponding step has completed.
pub struct PipelineContext {
    pub request: JobRequest,

    /// Set after rasterization: one PNG per page, in document order.
    pub images: Option<Vec<Vec<u8>>>,

    /// Set after extraction (and rewrite): raw text per page, 1-based order.
    pub pages: Option<Vec<PageText>>,

    /// Set after classification, aligned with `pages`.
    pub classified: Option<Vec<Vec<ClassifiedLine>>>,

    /// Set after classification.
    pub word_count: Option<u64>,

    /// Set after assembly.
    pub artifacts: Option<OutputArtifacts>,
}

impl PipelineContext {
    pub fn new(request: JobRequest) -> Self {
        Self {
            request,
            images: None,
            pages: None,
            classified: None,
            word_count: None,
            artifacts: None,
        }
    }
}
